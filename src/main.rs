fn main() {
    kwparametrize::cli::run();
}
