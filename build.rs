// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Boolean flag argument
fn flag(id: &'static str, long: &'static str, short: Option<char>, help: &'static str) -> Arg {
    let arg = Arg::new(id)
        .long(long)
        .action(ArgAction::SetTrue)
        .help(help);
    match short {
        Some(c) => arg.short(c),
        None => arg,
    }
}

fn build_cli() -> Command {
    Command::new("py2pyd")
        .version(env!("CARGO_PKG_VERSION"))
        .author("py2pyd Contributors")
        .about("Compile Python sources into native extension modules (.so/.pyd)")
        .arg(Arg::new("path").required(true).help("Python file or directory to convert"))
        .arg(flag("recursive", "recursive", Some('r'), "Convert the whole directory tree"))
        .arg(flag(
            "remove",
            "remove",
            Some('d'),
            "Delete original .py files after they convert successfully",
        ))
        .arg(flag("yes", "yes", Some('y'), "Do not ask for confirmation before deleting sources"))
        .arg(
            Arg::new("python")
                .long("python")
                .env("PY2PYD_PYTHON")
                .value_name("PYTHON")
                .help("Python interpreter with Cython installed"),
        )
        .arg(
            Arg::new("language_level")
                .long("language-level")
                .default_value("3")
                .help("Cython language_level directive"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .default_value("600")
                .help("Per-file build timeout in seconds"),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .default_value("1")
                .help("Number of directories to convert in parallel"),
        )
        .arg(flag("keep_ui", "keep-ui", None, "Keep stray *.ui files in source directories"))
        .arg(flag("json", "json", None, "Print the final report as JSON on stdout"))
        .arg(flag("quiet", "quiet", Some('q'), "Hide the progress bar"))
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v info, -vv debug)"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("py2pyd.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
