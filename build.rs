fn main() {
    // Tell cargo to rerun the build script if the template grammar changes
    println!("cargo:rerun-if-changed=src/template.pest");
}
