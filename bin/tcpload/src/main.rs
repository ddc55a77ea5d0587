fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    if let Err(err) = libcli::run() {
        eprintln!("{}", err);
        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(ce) = cause.downcast_ref::<libconfig::ConfigError>() {
            return match ce {
                libconfig::ConfigError::Json(_) => 3,
                libconfig::ConfigError::Validation(_) => 3,
                libconfig::ConfigError::Io(_) => 2,
            };
        }
    }
    2
}
