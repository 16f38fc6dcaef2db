fn main() -> std::process::ExitCode {
    shopfront_lib::run()
}
