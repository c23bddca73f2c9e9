use ::std::io;

use ::fern;
use ::log;
use ::time;

use crate::config;
use crate::error::RResult;

/// Turn a `loglevel` config string into a level filter. Unknown values get
/// "warn".
pub fn parse_level(levelstr: &str) -> log::LevelFilter {
    match levelstr.to_lowercase().as_ref() {
        "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => {
            println!("recsync: config: bad `loglevel` value (\"{}\"), defaulting to \"warn\"", levelstr);
            log::LevelFilter::Warn
        }
    }
}

/// a simple wrapper (pretty much direct from documentation) that sets up
/// logging to STDOUT via fern/log
pub fn setup_logger() -> RResult<()> {
    let levelstr: String = config::get(&["loglevel"])?;
    let level = parse_level(&levelstr);
    let res = fern::Dispatch::new()
        .format(|out, message, record| {
            let now = match time::now().strftime("%Y-%m-%d][%H:%M:%S") {
                Ok(x) => x.to_string(),
                Err(_) => String::from("????"),
            };
            out.finish(format_args!("[{}][{}] {}", now, record.level(), message))
        })
        .level(level)
        .chain(io::stdout())
        .apply();
    match res {
        Ok(_) => (),
        // someone beat us to it, which is fine
        Err(_) => log::set_max_level(level),
    }
    Ok(())
}
