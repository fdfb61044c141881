/*
 * Murmuration
 *
 * A flock of boids steering by separation, alignment and cohesion over a
 * stylized fluid field. Pass a JSON config path as the first argument to
 * override defaults; the file is reloaded whenever it changes.
 *
 * Logging follows RUST_LOG (default "info").
 */

use murmuration::app;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    nannou::app(app::model).update(app::update).run();
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
