use std::env;
use std::fs;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

static TEST_DATA: &str = "./tests/data/";
static TEST_TEMPLATE: &str = r#"
    #[test]
    fn {test_name}() {
        let filename = Path::new("{filename}");
        do_test(filename);
    }
"#;

fn main() {
    let out_dir = env::var_os("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("test_files.rs");

    let file = fs::File::create(dest_path).unwrap();
    let mut buf = BufWriter::new(file);

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}", TEST_DATA);

    for entry in get_all_scripts() {
        let filename = entry.path().to_string_lossy().replace('\\', "/");
        if should_skip(&filename) {
            continue;
        }

        let test_name = filename
            .trim_start_matches(TEST_DATA)
            .trim_end_matches(".tlox")
            .replace(['/', '-', '.'], "_");

        let test_case = TEST_TEMPLATE
            .replace("{test_name}", &test_name)
            .replace("{filename}", &filename);

        write!(&mut buf, "{}", test_case).unwrap();
    }
}

/// Every `.tlox` script under the data directory, in a stable order so the
/// generated file only changes when the scripts do.
fn get_all_scripts() -> Vec<walkdir::DirEntry> {
    WalkDir::new(TEST_DATA)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|o| o.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "tlox"))
        .collect()
}

fn should_skip(filename: &str) -> bool {
    let skip_list = ["benchmark/"];
    skip_list.iter().any(|s| filename.contains(s))
}
