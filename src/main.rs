fn main() {
    if let Err(err) = nodegraph_canvas::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
