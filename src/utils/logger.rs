use std::io::Write;

use chrono::Utc;
use env_logger::Env;
use log::info;

/// Installs the process logger. `RUST_LOG` overrides `default_level`;
/// calling it again is a no-op.
pub fn init(default_level: &str) {
    let installed = env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] [{}:{}] {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init()
        .is_ok();

    if installed {
        info!("Messaging logger initialized (default level: {})", default_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init("debug");
        init("info");
    }
}
