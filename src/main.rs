use confpatch::{cli, ui::output};

fn main() {
    if let Err(err) = cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
