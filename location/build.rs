//! Build script for geobridge-location.
//!
//! Android: compiles `LocationHelper.kt` to DEX for embedding. The helper
//! links against Play Services location; point `GEOBRIDGE_ANDROID_CLASSPATH`
//! at those jars (path-list separated).

use std::{env, fs, path::PathBuf, process::Command};

const KOTLIN_FILE_RELATIVE_PATH: &str = "src/sys/android/LocationHelper.kt";
const CLASSPATH_ENV: &str = "GEOBRIDGE_ANDROID_CLASSPATH";

fn main() {
    println!("cargo:rerun-if-changed={KOTLIN_FILE_RELATIVE_PATH}");
    println!("cargo:rerun-if-env-changed={CLASSPATH_ENV}");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "android" {
        build_android();
    }
}

fn build_android() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let kotlin_file = PathBuf::from(
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo"),
    )
    .join(KOTLIN_FILE_RELATIVE_PATH);

    let android_jar_path = android_build::android_jar(None).expect("Failed to find android.jar");
    let libraries: Vec<PathBuf> = env::var_os(CLASSPATH_ENV)
        .map(|paths| env::split_paths(&paths).collect())
        .unwrap_or_default();

    let mut classpath = vec![android_jar_path.clone()];
    classpath.extend(libraries.iter().cloned());
    let classpath = env::join_paths(classpath).expect("classpath entries are joinable");

    // Compile .kt -> .class using kotlinc
    let classes_dir = out_dir.join("classes");
    let _ = fs::remove_dir_all(&classes_dir);
    fs::create_dir_all(&classes_dir).expect("Failed to create classes directory");

    let kotlinc_status = Command::new("kotlinc")
        .arg("-classpath")
        .arg(&classpath)
        .arg("-d")
        .arg(&classes_dir)
        .arg(&kotlin_file)
        .status()
        .expect("Failed to run kotlinc - is Kotlin compiler installed?");

    assert!(kotlinc_status.success(), "kotlinc compilation failed");

    // The helper's listeners compile to nested classes next to it.
    let package_dir = classes_dir.join("geobridge").join("location");
    let class_files: Vec<PathBuf> = fs::read_dir(&package_dir)
        .expect("kotlinc produced the helper package")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "class"))
        .collect();

    let d8_jar_path = android_build::android_d8_jar(None).expect("Failed to find d8.jar");

    // Convert .class -> .dex using D8
    let mut d8 = android_build::JavaRun::new();
    d8.class_path(d8_jar_path)
        .main_class("com.android.tools.r8.D8")
        .arg("--lib")
        .arg(&android_jar_path);
    for library in &libraries {
        d8.arg("--classpath").arg(library);
    }
    d8.arg("--output").arg(&out_dir);
    for class_file in &class_files {
        d8.arg(class_file);
    }

    assert!(
        d8.run()
            .expect("failed to acquire exit status for java d8.jar invocation")
            .success(),
        "D8 dexing failed"
    );
}
