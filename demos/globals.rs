static mut X: i32 = 7;

fn main() {
    unsafe {
        println!("{}", X);
    }
}
