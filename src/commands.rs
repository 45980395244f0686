//! One module per subcommand, each adding a `cmd_*` method to [`App`](crate::App).

pub mod catalog;
pub mod collect;
pub mod publish;

/// `1 file`, `2 files`
pub(crate) fn files_label(count: usize) -> String {
    if count == 1 {
        "1 file".to_string()
    } else {
        format!("{} files", count)
    }
}
