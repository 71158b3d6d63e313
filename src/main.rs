fn main() {
    use kube_relations_explorer::cli::parse;
    let cli = parse();
    kube_relations_explorer::app::init_tracing(cli.verbose, cli.quiet);
    let code = kube_relations_explorer::app::run_cli(cli);
    if code != 0 {
        std::process::exit(code);
    }
}
