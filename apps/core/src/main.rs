fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match folderdrop_core::runtime::parse_cli_args(&args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("[folderdrop-core] {error}");
            std::process::exit(2);
        }
    };

    if let Err(error) = folderdrop_core::runtime::run_with_options(options) {
        eprintln!("[folderdrop-core] {error}");
        std::process::exit(1);
    }
}
