//! Logger setup. Library code logs through the `log` facade; this installs
//! the backend for the current target. Repeat calls are harmless.

#[cfg(target_arch = "wasm32")]
pub fn init() {
    console_error_panic_hook::set_once();
    // Fails only when a logger is already installed.
    console_log::init_with_level(log::Level::Info).ok();
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
