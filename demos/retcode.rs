fn answer() -> i32 {
    1
}

fn main() {
    std::process::exit(answer());
}
