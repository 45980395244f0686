/// Run a command and capture its stdout along with its result.
#[macro_export]
macro_rules! run_and_capture {
    ($cmd:expr) => {{
        let mut out = Vec::new();
        let result = $cmd(&mut out).await;
        (result, String::from_utf8(out)?)
    }};
}
