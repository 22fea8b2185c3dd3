fn main() {
    let p: *const i32 = std::ptr::null();
    unsafe {
        println!("{}", *p);
    }
}
