use std::io::Write;

/// 日志格式：`[时间] 等级 [文件:行号] 内容`
fn format_record(buf: &mut env_logger::fmt::Formatter, record: &log::Record) -> std::io::Result<()> {
    let debug_style = buf
        .default_level_style(log::Level::Debug)
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Cyan)));
    let info_style = buf
        .default_level_style(log::Level::Info)
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green)));
    let warn_style = buf
        .default_level_style(log::Level::Warn)
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow)));
    let error_style = buf
        .default_level_style(log::Level::Error)
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red)));

    let level_style = match record.level() {
        log::Level::Debug => debug_style,
        log::Level::Info => info_style,
        log::Level::Warn => warn_style,
        log::Level::Error => error_style,
        _ => buf.default_level_style(record.level()),
    };
    let grey_style = info_style.fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(110, 110, 110))));
    let black_style = info_style.fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(75, 75, 75))));

    let line = record.line().unwrap_or(!0);
    let file = record.file().unwrap_or("").rsplit(['\\', '/']).next().unwrap_or("");
    let time = chrono::Local::now().format("%H:%M:%S%.3f");
    let level = record.level();

    writeln!(
        buf,
        "{level_style}[{time}] {level}{level_style:#} {grey_style}[{file}:{line}]{grey_style:#} \
         {black_style}{}{black_style:#}",
        record.args()
    )
}

fn builder(level: log::LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.format(format_record).filter(None, level);
    // RUST_LOG 可以覆盖默认等级，例如 RUST_LOG=vanguard_render_graph=trace
    builder.parse_default_env();
    builder
}

pub fn init_log() {
    init_log_with_level(log::LevelFilter::Info);
}

pub fn init_log_with_level(level: log::LevelFilter) {
    builder(level).init();
}

/// 测试中可能被多次调用，重复初始化时忽略错误
pub fn try_init_test_log() {
    let _ = builder(log::LevelFilter::Debug).is_test(true).try_init();
}
