use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

const DEFAULT_FILTER: &str = "warn,scriptreel=info";

const VERBOSE_FILTER: &str = "warn,scriptreel=debug";

/// Filter used when RUST_LOG is unset
fn default_filter(verbose: bool) -> &'static str {
    if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER }
}

/// Initialize logging. `verbose` raises the crate's own level to debug;
/// an explicit RUST_LOG always wins.
pub fn init_logger(verbose: bool) {
    let env = Env::default().filter_or("RUST_LOG", default_filter(verbose));

    let mut builder = Builder::from_env(env);

    // Явно подавляем шумные логи HTTP-стека
    builder
        .filter_module("mio", LevelFilter::Error)
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("hyper_util", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("rustls", LevelFilter::Warn)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        // stdout остаётся для JSON-результата
        .target(env_logger::Target::Stderr);

    // Повторная инициализация (тесты, batch) не должна паниковать
    let _ = builder.try_init();
}
