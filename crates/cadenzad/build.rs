//! Build script: render the `cadenzad(1)` manual page.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use time::{OffsetDateTime, format_description::well_known::Iso8601};

const EPOCH_DATE: &str = "1970-01-01";

/// Options documented in the manual, as `(flag, value, description)`.
const OPTIONS: &[(&str, &str, &str)] = &[
    ("--config-path", "FILE", "Read settings from FILE before the environment."),
    ("--hostname", "HOST", "Address to bind, or unix:/path for a Unix socket."),
    ("--port", "PORT", "TCP port to listen on (default 6600)."),
    ("--password", "SECRET", "Require clients to send this password first."),
    ("--max-connections", "N", "Close connections beyond N live sessions (default 20)."),
    ("--connection-timeout", "SECS", "Drop silent, non-idling clients (default 60, 0 disables)."),
    ("--command-denylist", "NAME", "Answer NAME with a disabled error; repeatable."),
    ("--default-playlist-scheme", "SCHEME", "Scheme for new stored playlists (default m3u)."),
    ("--library-path", "FILE", "JSON track catalogue that seeds the library."),
    ("--log-filter", "FILTER", "tracing filter directive (default info)."),
    ("--log-format", "FORMAT", "json or compact (default json)."),
];

/// Page date from `SOURCE_DATE_EPOCH`, so packaged builds are reproducible.
fn page_date() -> String {
    let Some(raw) = env::var("SOURCE_DATE_EPOCH").ok() else {
        return EPOCH_DATE.to_owned();
    };
    let formatted = raw
        .parse::<i64>()
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|moment| moment.format(&Iso8601::DATE).ok());
    formatted.unwrap_or_else(|| {
        println!("cargo:warning=ignoring unusable SOURCE_DATE_EPOCH '{raw}'");
        EPOCH_DATE.to_owned()
    })
}

fn render(name: &str, version: &str, date: &str) -> String {
    let mut page = format!(
        ".TH \"{title}\" \"1\" \"{date}\" \"{name} {version}\" \"Cadenza\"\n\
         .SH NAME\n\
         {name} \\- music server speaking the MPD protocol\n\
         .SH SYNOPSIS\n\
         .B {name}\n\
         [\\fIOPTIONS\\fR]\n\
         .SH DESCRIPTION\n\
         {name} serves one shared play queue to MPD clients over TCP or a Unix\n\
         socket. Clients waiting in idle are told when a subsystem they watch\n\
         changes.\n\
         .SH OPTIONS\n",
        title = name.to_uppercase(),
    );
    for (flag, value, description) in OPTIONS {
        page.push_str(&format!(
            ".TP\n\\fB{flag}\\fR \\fI{value}\\fR\n{description}\n"
        ));
    }
    page.push_str(
        ".SH ENVIRONMENT\n\
         Each option may be given as a \\fBCADENZA_\\fR variable, for example\n\
         \\fBCADENZA_PORT\\fR.\n\
         .SH SIGNALS\n\
         SIGINT, SIGTERM, SIGQUIT and SIGHUP stop the daemon cleanly.\n",
    );
    page
}

/// `target/generated-man/<target>/<profile>`, found by walking up from `OUT_DIR`.
fn man_dir() -> PathBuf {
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown-target".to_owned());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown-profile".to_owned());
    let root = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .and_then(|out| out.ancestors().nth(4).map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("target"));
    root.join("generated-man").join(target).join(profile)
}

fn install(page: &str, dir: &Path, file_name: &str) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let staged = dir.join(format!("{file_name}.tmp"));
    fs::write(&staged, page)?;
    fs::rename(&staged, dir.join(file_name))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for variable in ["CARGO_PKG_VERSION", "SOURCE_DATE_EPOCH", "TARGET", "PROFILE"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    let name = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| "cadenzad".to_owned());
    let version = env::var("CARGO_PKG_VERSION")?;
    let page = render(&name, &version, &page_date());
    let file_name = format!("{name}.1");

    install(&page, &man_dir(), &file_name)?;
    if let Some(out_dir) = env::var_os("OUT_DIR") {
        let out_dir = PathBuf::from(out_dir);
        if let Err(error) = install(&page, &out_dir, &file_name) {
            println!("cargo:warning=could not stage {file_name} in OUT_DIR: {error}");
        }
    }
    Ok(())
}
