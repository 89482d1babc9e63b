/// Display version information
pub fn execute() {
    println!("strmatch {}", env!("CARGO_PKG_VERSION"));
    println!("Privacy-preserving STR profile matching");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_execute() {
        execute();
    }
}
