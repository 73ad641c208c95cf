use crate::config::{Config, RustEnv};
use log::LevelFilter;
use simplelog::{self, ConfigBuilder};

/// Log targets silenced below TRACE. simplelog matches them as prefixes, so
/// `tower` also covers `tower_http`'s request traces and `tracing` covers the
/// `tracing::span` records the `log` bridge emits for span enter/exit.
const NOISY_TARGETS: &[&str] = &["tower", "tracing", "hyper", "h2", "axum", "reqwest", "rustls"];

pub struct Logger {}

impl Logger {
    /// Install the terminal logger for the whole process.
    ///
    /// Library crates log through `tracing` with its `log` bridge, so their
    /// events arrive here under their module path.
    pub fn init_logger(config: &Config) {
        simplelog::TermLogger::init(
            config.log_level_filter,
            Self::log_config(config.log_level_filter),
            simplelog::TerminalMode::Mixed,
            Self::color_choice(&config.runtime_env),
        )
        .expect("Failed to start simplelog");
    }

    fn log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        for target in Self::silenced_targets(level) {
            builder.add_filter_ignore_str(target);
        }

        builder.build()
    }

    fn silenced_targets(level: LevelFilter) -> &'static [&'static str] {
        if level < LevelFilter::Trace {
            NOISY_TARGETS
        } else {
            &[]
        }
    }

    /// ANSI colors are only emitted in development.
    fn color_choice(runtime_env: &RustEnv) -> simplelog::ColorChoice {
        match runtime_env {
            RustEnv::Development => simplelog::ColorChoice::Auto,
            RustEnv::Production | RustEnv::Staging => simplelog::ColorChoice::Never,
        }
    }
}
