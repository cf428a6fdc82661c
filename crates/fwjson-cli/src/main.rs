use clap::{Args as ClapArgs, Parser, Subcommand};
use fwjson_core::{JsonOpts, JsonValue};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fwjson",
    about = "Inspect and edit firmware JSON documents via JSON Pointer",
    version
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Parse a document and report its root kind and size
    Check(LoadArgs),
    /// Get value at JSON pointer
    Get(EditArgs),
    /// List children at JSON pointer
    List(EditArgs),
    /// Set value (raw JSON) at JSON pointer; prints or writes with --out
    Set(SetArgs),
    /// Remove key or array element at JSON pointer; prints or writes with --out
    Remove(RemoveArgs),
    /// Print the UCS2 code units of a string, failing outside the BMP
    Ucs2(Ucs2Args),
}

#[derive(ClapArgs, Debug)]
struct LoadArgs {
    /// JSON document to load
    path: PathBuf,
    /// Max container nesting depth (values above 127 act as 127)
    #[arg(long, default_value_t = 64)]
    max_depth: usize,
}

#[derive(ClapArgs, Debug)]
struct EditArgs {
    #[command(flatten)]
    load: LoadArgs,
    /// JSON Pointer, e.g. /Members/0/Id
    #[arg(long)]
    ptr: String,
}

#[derive(ClapArgs, Debug)]
struct SetArgs {
    #[command(flatten)]
    load: LoadArgs,
    /// JSON Pointer, e.g. /Members/0/Id
    #[arg(long)]
    ptr: String,
    /// New value as raw JSON (e.g., 123, true, "str", {"a":1})
    #[arg(long)]
    value: String,
    /// Optional output .json path to write; otherwise prints to stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct RemoveArgs {
    #[command(flatten)]
    load: LoadArgs,
    /// JSON Pointer, e.g. /Members/0 or /Oem/Vendor
    #[arg(long)]
    ptr: String,
    /// Optional output .json path to write; otherwise prints to stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct Ucs2Args {
    /// Text to convert
    text: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Cmd::Check(a) => cmd_check(a),
        Cmd::Get(a) => cmd_get(a),
        Cmd::List(a) => cmd_list(a),
        Cmd::Set(a) => cmd_set(a),
        Cmd::Remove(a) => cmd_remove(a),
        Cmd::Ucs2(a) => cmd_ucs2(a),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(args: &LoadArgs) -> JsonValue {
    let opts = JsonOpts {
        max_depth: args.max_depth,
        ..Default::default()
    };
    fwjson_core::load_file(&args.path, &opts).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(2);
    })
}

fn render(v: &JsonValue) -> String {
    if v.kind().is_container() {
        let opts = JsonOpts {
            pretty: true,
            ..Default::default()
        };
        fwjson_core::text::to_text_with(v, &opts).unwrap_or_else(|_| v.to_string())
    } else {
        v.to_string()
    }
}

fn emit(v: &JsonValue, out: Option<PathBuf>) {
    if let Some(out) = out {
        let opts = JsonOpts {
            pretty: true,
            ..Default::default()
        };
        fwjson_core::write_file(&out, v, &opts).unwrap_or_else(|e| {
            eprintln!("error writing: {}", e);
            std::process::exit(5);
        });
        tracing::info!(path = %out.display(), "wrote document");
    } else {
        println!("{}", render(v));
    }
}

fn cmd_check(args: LoadArgs) {
    let v = load(&args);
    let len = match (v.as_object(), v.as_array()) {
        (Ok(o), _) => o.len(),
        (_, Ok(a)) => a.len(),
        _ => 0,
    };
    println!("{:?}\t(len={})\t(depth={})", v.kind(), len, v.depth());
}

fn cmd_get(args: EditArgs) {
    let v = load(&args.load);
    match fwjson_core::get_by_pointer(&v, &args.ptr) {
        Ok(x) => println!("{}", render(&x)),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(3);
        }
    }
}

fn cmd_list(args: EditArgs) {
    let v = load(&args.load);
    match fwjson_core::list_children(&v, &args.ptr) {
        Ok(children) => {
            for c in children {
                println!(
                    "{}\t{:?}{}",
                    c.key_or_index,
                    c.kind,
                    c.len.map(|n| format!("\t(len={})", n)).unwrap_or_default()
                );
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(3);
        }
    }
}

fn cmd_set(args: SetArgs) {
    let v = load(&args.load);
    let new_val = fwjson_core::parse_fragment(&args.value).unwrap_or_else(|e| {
        eprintln!("invalid --value JSON: {}", e);
        std::process::exit(3);
    });
    fwjson_core::set_by_pointer(&v, &args.ptr, new_val).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(4);
    });
    emit(&v, args.out);
}

fn cmd_remove(args: RemoveArgs) {
    let v = load(&args.load);
    fwjson_core::remove_at_pointer(&v, &args.ptr).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(4);
    });
    emit(&v, args.out);
}

fn cmd_ucs2(args: Ucs2Args) {
    match fwjson_core::utf8_to_ucs2(&args.text) {
        Ok(units) => {
            let hex: Vec<String> = units
                .as_slice_with_nul()
                .iter()
                .map(|u| format!("{:04x}", u))
                .collect();
            println!("{}", hex.join(" "));
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}
