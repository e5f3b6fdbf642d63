fn main() {
    if let Err(err) = caseflow::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
