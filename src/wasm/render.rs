use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Float32Array, Uint32Array};
use log::warn;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{
    window, HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram,
    WebGlShader, WebGlUniformLocation, WebGlVertexArrayObject,
};

use crate::layer::{DrawMode, Layer, LayerId};
use crate::scene::Scene;

// Bound before linking so every program agrees with the layer VAOs.
const A_POSITION: u32 = 0;
const A_COLOR: u32 = 1;

pub fn gl_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::LineStrip => GL::LINE_STRIP,
        DrawMode::Lines => GL::LINES,
        DrawMode::LineLoop => GL::LINE_LOOP,
        DrawMode::Triangles => GL::TRIANGLES,
        DrawMode::TriangleStrip => GL::TRIANGLE_STRIP,
        DrawMode::TriangleFan => GL::TRIANGLE_FAN,
    }
}

struct Program {
    program: WebGlProgram,
    u_time: Option<WebGlUniformLocation>,
    u_phase: Option<WebGlUniformLocation>,
}

/// GPU-side copy of one layer.
struct LayerState {
    revision: u64,
    vao: WebGlVertexArrayObject,
    positions: WebGlBuffer,
    colors: WebGlBuffer,
    indices: WebGlBuffer,
    count: i32,
    indexed: bool,
    // Sources the program was built from; `None` program means they failed.
    shaders: (String, String),
    program: Option<Program>,
}

impl LayerState {
    fn new(gl: &GL) -> Result<Self, JsValue> {
        let state = Self {
            revision: 0,
            vao: gl.create_vertex_array().ok_or("failed to create vertex array")?,
            positions: gl.create_buffer().ok_or("failed to create buffer")?,
            colors: gl.create_buffer().ok_or("failed to create buffer")?,
            indices: gl.create_buffer().ok_or("failed to create buffer")?,
            count: 0,
            indexed: false,
            shaders: (String::new(), String::new()),
            program: None,
        };

        gl.bind_vertex_array(Some(&state.vao));
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&state.positions));
        gl.vertex_attrib_pointer_with_i32(A_POSITION, 2, GL::FLOAT, false, 0, 0);
        gl.enable_vertex_attrib_array(A_POSITION);
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&state.colors));
        gl.vertex_attrib_pointer_with_i32(A_COLOR, 3, GL::FLOAT, false, 0, 0);
        gl.enable_vertex_attrib_array(A_COLOR);
        gl.bind_buffer(GL::ELEMENT_ARRAY_BUFFER, Some(&state.indices));
        gl.bind_vertex_array(None);
        Ok(state)
    }

    /// Re-upload buffers if the layer changed since the last upload.
    fn sync_geometry(&mut self, gl: &GL, layer: &Layer) {
        if self.revision == layer.revision() {
            return;
        }
        // WebGL attributes are single precision.
        let positions: Vec<f32> = layer.vertices().iter().flatten().map(|&v| v as f32).collect();
        let colors: Vec<f32> = layer.colors().iter().flatten().map(|&c| c as f32).collect();

        gl.bind_vertex_array(Some(&self.vao));
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&self.positions));
        gl.buffer_data_with_array_buffer_view(
            GL::ARRAY_BUFFER,
            &Float32Array::from(positions.as_slice()),
            GL::DYNAMIC_DRAW,
        );
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&self.colors));
        gl.buffer_data_with_array_buffer_view(
            GL::ARRAY_BUFFER,
            &Float32Array::from(colors.as_slice()),
            GL::DYNAMIC_DRAW,
        );
        match layer.indices() {
            Some(indices) => {
                gl.buffer_data_with_array_buffer_view(
                    GL::ELEMENT_ARRAY_BUFFER,
                    &Uint32Array::from(indices),
                    GL::DYNAMIC_DRAW,
                );
                self.indexed = true;
            }
            None => self.indexed = false,
        }
        gl.bind_vertex_array(None);

        self.count = layer.render_vertex_count() as i32;
        self.revision = layer.revision();
    }

    fn sync_program(&mut self, gl: &GL, layer: &Layer) {
        if self.shaders.0 == layer.vertex_shader() && self.shaders.1 == layer.fragment_shader() {
            return;
        }
        if let Some(old) = self.program.take() {
            gl.delete_program(Some(&old.program));
        }
        self.shaders = (layer.vertex_shader().to_string(), layer.fragment_shader().to_string());
        match link_program(gl, &self.shaders.0, &self.shaders.1) {
            Ok(program) => {
                self.program = Some(Program {
                    u_time: gl.get_uniform_location(&program, "u_time"),
                    u_phase: gl.get_uniform_location(&program, "u_phase"),
                    program,
                });
            }
            // Kept as `None` until the sources change, so this logs once.
            Err(log) => warn!("layer {}: shader build failed: {log}", layer.id()),
        }
    }

    fn delete(&self, gl: &GL) {
        gl.delete_vertex_array(Some(&self.vao));
        gl.delete_buffer(Some(&self.positions));
        gl.delete_buffer(Some(&self.colors));
        gl.delete_buffer(Some(&self.indices));
        if let Some(program) = &self.program {
            gl.delete_program(Some(&program.program));
        }
    }
}

pub struct Renderer {
    gl: GL,
    layers: HashMap<LayerId, LayerState>,
}

impl Renderer {
    pub fn new(gl: GL) -> Self {
        Self {
            gl,
            layers: HashMap::new(),
        }
    }

    /// Draw every visible layer in scene order. `time` is in seconds.
    pub fn draw(&mut self, scene: &Scene, time: f64, width: i32, height: i32) -> Result<(), JsValue> {
        let gl = &self.gl;
        gl.viewport(0, 0, width, height);
        gl.clear_color(0.08, 0.08, 0.1, 1.0);
        gl.clear(GL::COLOR_BUFFER_BIT);

        self.layers.retain(|id, state| {
            let keep = scene.layer(*id).is_some();
            if !keep {
                state.delete(gl);
            }
            keep
        });

        let cycle_time = (time % scene.period()) as f32;
        let phase = scene.phase(time) as f32;

        for layer in scene.layers() {
            if !layer.is_visible() || layer.render_vertex_count() == 0 {
                continue;
            }
            let state = match self.layers.entry(layer.id()) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => e.insert(LayerState::new(gl)?),
            };
            state.sync_geometry(gl, layer);
            state.sync_program(gl, layer);
            let Some(program) = &state.program else {
                continue;
            };

            gl.use_program(Some(&program.program));
            gl.uniform1f(program.u_time.as_ref(), cycle_time);
            gl.uniform1f(program.u_phase.as_ref(), phase);
            gl.line_width(layer.line_width());
            gl.bind_vertex_array(Some(&state.vao));
            let mode = gl_mode(layer.draw_mode());
            if state.indexed {
                gl.draw_elements_with_i32(mode, state.count, GL::UNSIGNED_INT, 0);
            } else {
                gl.draw_arrays(mode, 0, state.count);
            }
        }
        gl.bind_vertex_array(None);
        Ok(())
    }
}

fn compile_shader(gl: &GL, kind: u32, source: &str) -> Result<WebGlShader, String> {
    let shader = gl.create_shader(kind).ok_or("unable to create shader")?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    if gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(log)
    }
}

fn link_program(gl: &GL, vertex: &str, fragment: &str) -> Result<WebGlProgram, String> {
    let vs = compile_shader(gl, GL::VERTEX_SHADER, vertex)?;
    let fs = match compile_shader(gl, GL::FRAGMENT_SHADER, fragment) {
        Ok(fs) => fs,
        Err(log) => {
            gl.delete_shader(Some(&vs));
            return Err(log);
        }
    };
    let program = gl.create_program().ok_or("unable to create program")?;
    gl.attach_shader(&program, &vs);
    gl.attach_shader(&program, &fs);
    gl.bind_attrib_location(&program, A_POSITION, "a_position");
    gl.bind_attrib_location(&program, A_COLOR, "a_color");
    gl.link_program(&program);
    // The program keeps its own reference to attached shaders.
    gl.delete_shader(Some(&vs));
    gl.delete_shader(Some(&fs));

    if gl
        .get_program_parameter(&program, GL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(log)
    }
}

/// Size the canvas backing store to its laid-out size.
fn fit_canvas(canvas: &HtmlCanvasElement) {
    let w = canvas.client_width().max(1) as u32;
    let h = canvas.client_height().max(1) as u32;
    if canvas.width() != w || canvas.height() != h {
        canvas.set_width(w);
        canvas.set_height(h);
    }
}

fn request_frame(f: &Closure<dyn FnMut(f64)>) -> Result<i32, JsValue> {
    window()
        .ok_or("no window")?
        .request_animation_frame(f.as_ref().unchecked_ref())
}

/// Start the render loop: redraw `scene` into `canvas` every animation frame.
pub fn start(canvas: HtmlCanvasElement, scene: Rc<RefCell<Scene>>) -> Result<(), JsValue> {
    let gl: GL = canvas
        .get_context("webgl2")?
        .ok_or("WebGL2 not supported")?
        .dyn_into()?;

    // Resize canvas to fit its layout box
    fit_canvas(&canvas);
    let resize_closure = {
        let canvas = canvas.clone();
        Closure::wrap(Box::new(move || fit_canvas(&canvas)) as Box<dyn FnMut()>)
    };
    window()
        .ok_or("no window")?
        .add_event_listener_with_callback("resize", resize_closure.as_ref().unchecked_ref())?;
    resize_closure.forget();

    // Animation loop
    // `f` holds the animation-frame closure so that we can keep calling
    // `request_animation_frame` recursively. Storing it inside an `Option`
    // allows us to create the `Closure` first and then obtain a reference to
    // it from within itself.
    let f: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let g = f.clone();
    let mut renderer = Renderer::new(gl);
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |now_ms: f64| {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        if let Err(e) = renderer.draw(&scene.borrow(), now_ms / 1000.0, w, h) {
            warn!("frame failed: {e:?}");
        }

        // schedule next
        if let Some(next) = f.borrow().as_ref() {
            if let Err(e) = request_frame(next) {
                warn!("cannot schedule frame: {e:?}");
            }
        }
    }) as Box<dyn FnMut(f64)>));

    if let Some(first) = g.borrow().as_ref() {
        request_frame(first)?;
    }

    Ok(())
}
