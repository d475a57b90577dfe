fn main() -> std::process::ExitCode {
    visual_assist_lib::run()
}
