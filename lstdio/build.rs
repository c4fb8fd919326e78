// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

// Pre-build code for the lstdio crate.
//
// The few tunables of the logger are fixed at build time, since the line buffer lives on the stack
// and its size has to be a constant.  They are taken from the environment and written out as a
// small `config` module that the crate includes.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, bail, Context};

const DEFAULT_LINE_BUF_SIZE: usize = 2048;

fn main() -> anyhow::Result<()> {
    println!("cargo:rerun-if-env-changed=LSTDIO_LINE_BUF_SIZE");
    println!("cargo:rerun-if-env-changed=LSTDIO_DEFAULT_LEVEL");

    let line_buf_size = match env::var("LSTDIO_LINE_BUF_SIZE") {
        Ok(text) => text
            .trim()
            .parse::<usize>()
            .with_context(|| format!("LSTDIO_LINE_BUF_SIZE is not a number: {:?}", text))?,
        Err(env::VarError::NotPresent) => DEFAULT_LINE_BUF_SIZE,
        Err(e) => return Err(anyhow!(e).context("reading LSTDIO_LINE_BUF_SIZE")),
    };

    // Same single-letter syntax as LOG_LEVEL at runtime, minus 'N': the default level also names
    // the tag injected into untagged messages, so it has to be a real one.
    let default_level = match env::var("LSTDIO_DEFAULT_LEVEL") {
        Ok(text) => match text.bytes().next().map(|b| b.to_ascii_uppercase()) {
            Some(b'E') => "Error",
            Some(b'W') => "Warning",
            Some(b'I') => "Info",
            Some(b'D') => "Debug",
            _ => bail!("LSTDIO_DEFAULT_LEVEL must start with one of E, W, I, D: {:?}", text),
        },
        Err(env::VarError::NotPresent) => "Info",
        Err(e) => return Err(anyhow!(e).context("reading LSTDIO_DEFAULT_LEVEL")),
    };

    let outdir = env::var("OUT_DIR")?;
    let gen_path = Path::new(&outdir).join("config.rs");
    let mut f = File::create(&gen_path)
        .with_context(|| format!("creating {}", gen_path.display()))?;

    writeln!(f, "/// Upper bound, in bytes, of a single emitted line.")?;
    writeln!(f, "pub const LINE_BUF_SIZE: usize = {};", line_buf_size)?;
    writeln!(f, "/// Severity assumed for messages that carry no tag.")?;
    writeln!(
        f,
        "pub const DEFAULT_LEVEL: crate::level::Severity = crate::level::Severity::{};",
        default_level
    )?;

    Ok(())
}
