//! Built-in GLSL ES 3.00 sources used by new layers.

/// Passes the position through and forwards the per-vertex color.
/// `u_phase` runs from 0 to 1 once per animation period.
pub const DEFAULT_VERTEX_SHADER: &str = r#"#version 300 es
in vec2 a_position;
in vec3 a_color;
uniform float u_time;
uniform float u_phase;
out vec3 v_color;

void main() {
    v_color = a_color;
    gl_Position = vec4(a_position, 0.0, 1.0);
    gl_PointSize = 4.0;
}
"#;

pub const DEFAULT_FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
in vec3 v_color;
uniform float u_phase;
out vec4 out_color;

void main() {
    out_color = vec4(v_color, 1.0);
}
"#;
