fn main() {
    lust::cli::run();
}
