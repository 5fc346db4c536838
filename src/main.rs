use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    library: Option<PathBuf>,
    storage: Option<cartstream::model::StorageTarget>,
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    let mut clog = colog::default_builder();
    clog.filter(
        None,
        if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        },
    );
    clog.init();

    cartstream::app::run_with_startup(cartstream::app::AppStartupOptions {
        library: args.library,
        storage: args.storage,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--library" | "-l" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--library requires a directory");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--library cannot be empty");
                }
                out.library = Some(PathBuf::from(value.trim()));
            }
            "--storage" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--storage requires sd or usb");
                };
                let Some(storage) = cartstream::model::StorageTarget::parse(value) else {
                    anyhow::bail!("unknown storage {value}, expected sd or usb");
                };
                out.storage = Some(storage);
            }
            "-v" | "--verbose" => out.verbose = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("cartstream");
    println!("  --library <dir>   Local mirror of the cartridge storage");
    println!("  --storage sd|usb  Storage the device launches from");
    println!("  --verbose         Debug logging");
}
