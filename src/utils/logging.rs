use chrono::Local;
use env_logger::{Builder, Env};
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the logging system. Level comes from `LOG_LEVEL` (default
/// `info`); format carries a local timestamp and the log target.
pub fn init_logger() {
    INIT.call_once(|| {
        let env = Env::default().filter_or("LOG_LEVEL", "info");

        Builder::from_env(env)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} [{}] - {}: {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}
