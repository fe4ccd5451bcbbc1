fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Only hardware builds need the ESP-IDF environment; host builds and
    // tests compile without the toolchain.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
