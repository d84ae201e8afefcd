use serde_json::{json, Value};
use vertex_viz::document::import_json;
use vertex_viz::geometry::WHITE;
use vertex_viz::{DrawMode, EditorConfig, EditorError, LayerId, Scene};

const RED: [f64; 3] = [1.0, 0.0, 0.0];
const BLUE: [f64; 3] = [0.0, 0.0, 1.0];

fn sample_scene() -> Scene {
    let mut scene = Scene::default();
    let outline = scene.add_layer("outline");
    {
        let l = scene.layer_mut(outline).unwrap();
        l.add_vertex([-0.5, -0.5], RED);
        l.add_vertex([0.5, -0.5], WHITE);
        l.add_vertex([0.0, 0.5], BLUE);
        l.add_vertex([-0.5, -0.5], RED);
        l.set_draw_mode(DrawMode::LineLoop);
        l.set_line_width(2.5);
    }
    let fill = scene.add_layer("fill");
    {
        let l = scene.layer_mut(fill).unwrap();
        l.add_vertex([0.1, 0.1], BLUE);
        l.add_vertex([0.2, 0.3], BLUE);
        l.add_vertex([0.3, 0.1], BLUE);
        l.set_draw_mode(DrawMode::Triangles);
        l.set_shaders("#version 300 es\nvoid main(){}", "#version 300 es\nvoid main(){}");
    }
    scene.set_period(3.5).unwrap();
    scene
}

#[test]
fn export_import_round_trip() {
    let original = sample_scene();
    let text = original.export_json().unwrap();

    let mut restored = Scene::default();
    let ids = restored.import_json(&text).unwrap();

    assert_eq!(ids, vec![LayerId(1), LayerId(2)]);
    assert_eq!(restored.period(), 3.5);
    assert_eq!(restored.layers().len(), original.layers().len());
    for (a, b) in original.layers().iter().zip(restored.layers()) {
        assert_eq!(a.name(), b.name());
        assert_eq!(a.vertices(), b.vertices());
        assert_eq!(a.colors(), b.colors());
        assert_eq!(a.indices(), b.indices());
        assert_eq!(a.draw_mode(), b.draw_mode());
        assert_eq!(a.line_width(), b.line_width());
        assert_eq!(a.vertex_shader(), b.vertex_shader());
        assert_eq!(a.fragment_shader(), b.fragment_shader());
    }
}

#[test]
fn export_matches_document_format() {
    let text = sample_scene().export_json().unwrap();
    let doc: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(doc["period"], json!(3.5));
    let layer = &doc["layers"][0];
    assert_eq!(layer["id"], json!(1));
    assert_eq!(layer["name"], json!("outline"));
    assert_eq!(layer["vertices"], json!([[-0.5, -0.5], [0.5, -0.5], [0.0, 0.5]]));
    assert_eq!(layer["colors"], json!([[1.0, 0.0, 0.0], [1.0, 1.0, 1.0], [0.0, 0.0, 1.0]]));
    assert_eq!(layer["indices"], json!([0, 1, 2, 0]));
    assert_eq!(layer["mode"], json!("LINE_LOOP"));
    assert_eq!(layer["lineWidth"], json!(2.5));
    assert!(layer["vertexShader"].is_string());
    assert!(layer["fragmentShader"].is_string());
}

#[test]
fn never_drawn_layer_reloads_flat() {
    let text = json!({
        "layers": [{
            "id": 4, "name": "points",
            "vertices": [[0.0, 0.0], [0.5, 0.0], [0.5, 0.5]],
            "colors": [[1, 1, 1], [1, 1, 1], [1, 1, 1]],
            "indices": [],
            "mode": "LINE_STRIP", "lineWidth": 1
        }],
        "period": 1.0
    })
    .to_string();

    let mut scene = Scene::default();
    scene.import_json(&text).unwrap();
    let layer = &scene.layers()[0];
    assert!(!layer.is_indexed());
    assert_eq!(layer.render_vertex_count(), 3);

    let exported: Value = serde_json::from_str(&scene.export_json().unwrap()).unwrap();
    assert!(exported["layers"][0].get("indices").is_none());

    let mut again = Scene::default();
    again.import_json(&exported.to_string()).unwrap();
    assert!(!again.layers()[0].is_indexed());
    assert_eq!(again.layers()[0].vertices(), layer.vertices());
}

#[test]
fn coordinates_keep_full_precision() {
    let text = json!({
        "layers": [{
            "vertices": [[0.123456789012, -0.987654321098], [0.5, 0.25]],
            "colors": [[0.333333333333, 0.1, 0.2], [1, 1, 1]],
            "indices": [0, 1, 0]
        }],
        "period": 1.0
    })
    .to_string();

    let mut scene = Scene::default();
    scene.import_json(&text).unwrap();
    let exported: Value = serde_json::from_str(&scene.export_json().unwrap()).unwrap();
    let layer = &exported["layers"][0];
    assert_eq!(layer["vertices"][0], json!([0.123456789012, -0.987654321098]));
    assert_eq!(layer["colors"][0], json!([0.333333333333, 0.1, 0.2]));
}

#[test]
fn empty_layer_exports_without_indices() {
    let mut scene = Scene::default();
    scene.add_layer("blank");
    let exported: Value = serde_json::from_str(&scene.export_json().unwrap()).unwrap();
    assert!(exported["layers"][0].get("indices").is_none());
    assert_eq!(exported["layers"][0]["vertices"], json!([]));
}

#[test]
fn imported_ids_continue_after_existing() {
    let mut scene = Scene::default();
    scene.add_layer("a");
    scene.add_layer("b");
    let text = sample_scene().export_json().unwrap();

    let ids = scene.import_json(&text).unwrap();
    assert_eq!(ids, vec![LayerId(3), LayerId(4)]);
    assert_eq!(scene.current_layer_id(), Some(LayerId(3)));
    assert_eq!(scene.layers().len(), 4);
}

#[test]
fn pure_import_uses_existing_layers_for_ids() {
    let scene = sample_scene();
    let text = scene.export_json().unwrap();
    let imported = import_json(&text, scene.layers(), scene.config()).unwrap();
    let ids: Vec<_> = imported.layers.iter().map(|l| l.id()).collect();
    assert_eq!(ids, vec![LayerId(3), LayerId(4)]);
    assert_eq!(imported.period, 3.5);
}

fn assert_format_error(text: &str) {
    let mut scene = sample_scene();
    let before = scene.export_json().unwrap();
    let err = scene.import_json(text).unwrap_err();
    assert!(matches!(err, EditorError::Format(_)), "unexpected error: {err}");
    assert_eq!(scene.export_json().unwrap(), before);
}

#[test]
fn malformed_documents_are_rejected_whole() {
    assert_format_error("not json");
    assert_format_error(r#"{"period": 1.0}"#);
    assert_format_error(r#"{"layers": {"id": 1}}"#);
    assert_format_error(r#"{"layers": [], "period": -2}"#);
    assert_format_error(r#"{"layers": [], "period": "slow"}"#);
    assert_format_error(r#"{"layers": [{"vertices": [[0, 0]], "mode": "POINTS"}]}"#);
    assert_format_error(r#"{"layers": [{"vertices": [[0, 0], [1, 1]], "colors": [[1, 0, 0]]}]}"#);
    // second layer bad: first must not be kept either
    assert_format_error(r#"{"layers": [{"vertices": [[0, 0]]}, {"vertices": "nope"}]}"#);
}

#[test]
fn out_of_range_index_fails_import() {
    let mut scene = Scene::default();
    let text = r#"{"layers": [{"vertices": [[0, 0], [1, 0]], "indices": [0, 1, 2]}], "period": 1}"#;
    let err = scene.import_json(text).unwrap_err();
    assert!(matches!(err, EditorError::IndexOutOfRange { index: 2, count: 2 }));
    assert!(scene.layers().is_empty());
}

#[test]
fn missing_fields_take_config_defaults() {
    let config = EditorConfig {
        default_color: BLUE,
        period: 5.0,
        ..EditorConfig::default()
    };
    let mut scene = Scene::new(config.clone());
    scene.import_json(r#"{"layers": [{"vertices": [[0, 0], [1, 0]]}]}"#).unwrap();

    let layer = &scene.layers()[0];
    assert_eq!(scene.period(), 5.0);
    assert_eq!(layer.colors(), &[BLUE, BLUE]);
    assert_eq!(layer.draw_mode(), DrawMode::LineStrip);
    assert_eq!(layer.line_width(), 1.0);
    assert_eq!(layer.vertex_shader(), config.vertex_shader);
    assert_eq!(layer.name(), "Layer 1");
}

#[test]
fn flat_document_expands_indices() {
    let doc = sample_scene().to_flat_document();
    let outline = &doc.layers[0];
    assert!(outline.indices.is_none());
    assert_eq!(outline.vertices.len(), 4);
    assert_eq!(outline.vertices[0], outline.vertices[3]);
    assert_eq!(outline.colors[3], RED);
}

#[test]
fn layer_management() {
    let mut scene = Scene::default();
    assert_eq!(scene.current_layer_id(), None);

    let a = scene.add_layer("a");
    let b = scene.add_layer("");
    assert_eq!(scene.current_layer_id(), Some(b));
    assert_eq!(scene.layer(b).unwrap().name(), "Layer 2");

    scene.set_current_layer(a).unwrap();
    assert_eq!(scene.current_layer().unwrap().name(), "a");
    assert!(matches!(
        scene.set_current_layer(LayerId(99)),
        Err(EditorError::UnknownLayer(LayerId(99)))
    ));

    scene.move_layer(a, 10).unwrap();
    let order: Vec<_> = scene.layers().iter().map(|l| l.id()).collect();
    assert_eq!(order, vec![b, a]);

    // Removing the current layer falls back to the topmost one left.
    scene.layer_mut(b).unwrap().add_vertex([0.0, 0.0], WHITE);
    assert!(scene.remove_layer(a).is_some());
    assert_eq!(scene.current_layer_id(), Some(b));
    assert_eq!(scene.layer(b).unwrap().render_vertex_count(), 1);
    assert!(scene.remove_layer(a).is_none());

    scene.remove_layer(b);
    assert_eq!(scene.current_layer_id(), None);
    assert!(scene.current_layer_mut().is_none());
}

#[test]
fn period_must_be_positive() {
    let mut scene = Scene::default();
    assert!(matches!(scene.set_period(0.0), Err(EditorError::InvalidPeriod(_))));
    assert!(matches!(scene.set_period(f64::INFINITY), Err(EditorError::InvalidPeriod(_))));
    scene.set_period(2.0).unwrap();
    assert_eq!(scene.phase(3.0), 0.5);
    assert_eq!(scene.phase(-0.5), 0.75);
}

#[test]
fn compact_all_reports_changed_layers() {
    let mut scene = Scene::default();
    let text = r#"{"layers": [
        {"vertices": [[0, 0], [1, 0], [1, 1]], "indices": [0, 2]},
        {"vertices": [[0, 0], [1, 0]], "indices": [0, 1]},
        {"vertices": [[0, 0], [1, 0]]}
    ], "period": 1}"#;
    scene.import_json(text).unwrap();
    assert_eq!(scene.compact_all(), 1);
    assert_eq!(scene.layers()[0].vertices(), &[[0.0, 0.0], [1.0, 1.0]]);
    assert_eq!(scene.layers()[0].indices(), Some(&[0, 1][..]));
}

#[test]
fn config_parsing() {
    let config = EditorConfig::from_json(r#"{"tolerance": 0.01, "drawMode": "TRIANGLES"}"#).unwrap();
    assert_eq!(config.tolerance, 0.01);
    assert_eq!(config.draw_mode, DrawMode::Triangles);
    assert_eq!(config.period, EditorConfig::default().period);

    assert!(matches!(EditorConfig::from_json(r#"{"tolerence": 1}"#), Err(EditorError::Config(_))));
    assert!(matches!(EditorConfig::from_json(r#"{"period": 0}"#), Err(EditorError::Config(_))));

    let coarse = EditorConfig { tolerance: -1.0, ..EditorConfig::default() };
    assert_eq!(coarse.effective_tolerance(), vertex_viz::geometry::MIN_TOLERANCE);
}
