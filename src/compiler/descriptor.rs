// src/compiler/descriptor.rs

//! Transient setuptools build script for a single module

use crate::platform::PlatformFlags;
use serde_json::Value;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Build instructions for exactly one extension module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
    /// Extension module name (the source stem)
    pub module: String,
    /// Source file, relative to the build directory
    pub source: String,
    pub flags: PlatformFlags,
    /// Cython `language_level` directive
    pub language_level: String,
}

impl BuildDescriptor {
    pub fn new(
        module: impl Into<String>,
        source: impl Into<String>,
        flags: PlatformFlags,
        language_level: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            source: source.into(),
            flags,
            language_level: language_level.into(),
        }
    }

    /// Render the build script
    ///
    /// Values are emitted as JSON literals, which Python parses unchanged.
    pub fn render(&self) -> String {
        let module = literal(&self.module);
        format!(
            "from setuptools import setup, Extension\n\
             from Cython.Build import cythonize\n\
             \n\
             extensions = [\n\
             \x20   Extension(\n\
             \x20       {module},\n\
             \x20       [{source}],\n\
             \x20       extra_compile_args={compile_args},\n\
             \x20       extra_link_args={link_args},\n\
             \x20   )\n\
             ]\n\
             \n\
             setup(\n\
             \x20   name={module},\n\
             \x20   ext_modules=cythonize(\n\
             \x20       extensions,\n\
             \x20       compiler_directives={{\"language_level\": {level}}},\n\
             \x20   ),\n\
             )\n",
            module = module,
            source = literal(&self.source),
            compile_args = Value::from(self.flags.compile_args.clone()),
            link_args = Value::from(self.flags.link_args.clone()),
            level = literal(&self.language_level),
        )
    }

    /// Write the script as a hidden, uniquely named file in `dir`
    ///
    /// The file is deleted when the returned handle is dropped.
    pub fn write_in(&self, dir: &Path) -> io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(".py2pyd-setup-")
            .suffix(".py")
            .tempfile_in(dir)?;
        file.write_all(self.render().as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}

fn literal(value: &str) -> String {
    Value::from(value).to_string()
}
