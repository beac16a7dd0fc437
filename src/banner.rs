// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    let banner = r#"
 ____       _                   __  __           _
|  _ \  ___| |__  _   _  __ _  |  \/  | __ _ ___| |_ ___ _ __
| | | |/ _ \ '_ \| | | |/ _` | | |\/| |/ _` / __| __/ _ \ '__|
| |_| |  __/ |_) | |_| | (_| | | |  | | (_| \__ \ ||  __/ |
|____/ \___|_.__/ \__,_|\__, | |_|  |_|\__,_|___/\__\___|_|
                        |___/

    Find the bug, fix the code, pass the tests
"#;
    println!("{}", banner);
}
