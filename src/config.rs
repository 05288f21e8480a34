//! Command line surface of the demo binary

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};

use crate::assets::AssetFs;
use crate::gfx::GraphicsFlags;

/// Always searched first for data files
pub const DEFAULT_DATA_DIR: &str = "assets";
/// Always searched last for shaders
pub const DEFAULT_SHADER_DIR: &str = "shaders";
pub const DEFAULT_SHADER: &str = "computer.wgsl";

#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    pub data_dirs: Vec<PathBuf>,
    pub shader_dirs: Vec<PathBuf>,
    /// Material shader of the demo object
    pub shader: String,
    pub fpe: bool,
    pub watch: bool,
    pub flags: GraphicsFlags,
}

impl DemoConfig {
    pub fn data_fs(&self) -> AssetFs {
        AssetFs::new(self.data_dirs.iter())
    }

    pub fn shader_fs(&self) -> AssetFs {
        AssetFs::new(self.shader_dirs.iter())
    }
}

pub fn command() -> Command {
    Command::new("lighting")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Deferred lighting demo: a textured computer lit by the sun")
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .value_name("DIR")
                .help("Adds a directory to the data search path")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("shaders")
                .short('s')
                .long("shaders")
                .value_name("DIR")
                .help("Adds a directory to the shader search path")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("shader")
                .short('f')
                .long("shader")
                .value_name("NAME")
                .help("Material shader for the demo object")
                .default_value(DEFAULT_SHADER),
        )
        .arg(
            Arg::new("fpe")
                .long("fpe")
                .help("Trap on floating point exceptions")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("msaa")
                .long("msaa")
                .value_name("SAMPLES")
                .help("Geometry buffer sample count")
                .default_value("0")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("srgb")
                .long("srgb")
                .help("Present through an sRGB surface")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ldr")
                .long("ldr")
                .help("Accumulate lighting in 8 bits per channel")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Log GPU errors with their debug group")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("watch")
                .long("watch")
                .help("Reload the demo shader when it changes")
                .action(ArgAction::SetTrue),
        )
}

/// Parses the process arguments; `--help` and `--version` come back as errors
/// whose `exit` prints them and exits with status 0
pub fn parse_args<I, T>(args: I) -> Result<DemoConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;

    let dirs = |id: &str| -> Vec<PathBuf> {
        matches
            .get_many::<PathBuf>(id)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    };
    let mut data_dirs = vec![PathBuf::from(DEFAULT_DATA_DIR)];
    data_dirs.extend(dirs("data"));
    let mut shader_dirs = dirs("shaders");
    shader_dirs.push(PathBuf::from(DEFAULT_SHADER_DIR));

    Ok(DemoConfig {
        data_dirs,
        shader_dirs,
        shader: matches
            .get_one::<String>("shader")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SHADER.to_owned()),
        fpe: matches.get_flag("fpe"),
        watch: matches.get_flag("watch"),
        flags: GraphicsFlags {
            debug: matches.get_flag("debug"),
            srgb: matches.get_flag("srgb"),
            hdr: !matches.get_flag("ldr"),
            msaa: matches.get_one::<u32>("msaa").copied().unwrap_or(0),
        },
    })
}

#[cfg(all(target_os = "linux", target_env = "gnu", any(target_arch = "x86", target_arch = "x86_64")))]
mod fenv {
    use std::os::raw::c_int;

    pub const FE_INVALID: c_int = 0x01;
    pub const FE_DIVBYZERO: c_int = 0x04;
    pub const FE_OVERFLOW: c_int = 0x08;

    extern "C" {
        pub fn feenableexcept(excepts: c_int) -> c_int;
    }
}

/// Traps divide-by-zero, invalid and overflow; returns whether traps are on
#[cfg(all(target_os = "linux", target_env = "gnu", any(target_arch = "x86", target_arch = "x86_64")))]
pub fn enable_fpe() -> bool {
    // SAFETY: feenableexcept only changes the floating point control word of this thread
    let previous = unsafe { fenv::feenableexcept(fenv::FE_INVALID | fenv::FE_DIVBYZERO | fenv::FE_OVERFLOW) };
    if previous < 0 {
        log::warn!("could not enable floating point exceptions");
        return false;
    }
    log::info!("floating point exceptions enabled");
    true
}

#[cfg(not(all(target_os = "linux", target_env = "gnu", any(target_arch = "x86", target_arch = "x86_64"))))]
pub fn enable_fpe() -> bool {
    log::warn!("floating point exceptions are not supported on this platform");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = parse_args(["lighting"]).unwrap();
        assert_eq!(config.data_dirs, vec![PathBuf::from("assets")]);
        assert_eq!(config.shader_dirs, vec![PathBuf::from("shaders")]);
        assert_eq!(config.shader, "computer.wgsl");
        assert!(!config.fpe);
        assert!(!config.watch);
        assert_eq!(config.flags, GraphicsFlags::default());
    }

    #[test]
    fn test_search_path_order() {
        let config = parse_args(["lighting", "-d", "a", "--data", "b", "-s", "x", "-s", "y"]).unwrap();
        assert_eq!(
            config.data_dirs,
            vec![PathBuf::from("assets"), PathBuf::from("a"), PathBuf::from("b")]
        );
        assert_eq!(
            config.shader_dirs,
            vec![PathBuf::from("x"), PathBuf::from("y"), PathBuf::from("shaders")]
        );
        assert_eq!(config.data_fs().dirs(), config.data_dirs.as_slice());
    }

    #[test]
    fn test_graphics_flags() {
        let config = parse_args([
            "lighting", "--msaa", "4", "--srgb", "--ldr", "--debug", "--watch", "--fpe", "-f", "glow.wgsl",
        ])
        .unwrap();
        assert_eq!(
            config.flags,
            GraphicsFlags {
                debug: true,
                srgb: true,
                hdr: false,
                msaa: 4
            }
        );
        assert!(config.watch);
        assert!(config.fpe);
        assert_eq!(config.shader, "glow.wgsl");
    }

    #[test]
    fn test_help_and_bad_values() {
        let help = parse_args(["lighting", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_eq!(help.exit_code(), 0);

        let bad = parse_args(["lighting", "--msaa", "many"]).unwrap_err();
        assert_eq!(bad.kind(), clap::error::ErrorKind::ValueValidation);

        let unknown = parse_args(["lighting", "--teapots"]).unwrap_err();
        assert_eq!(unknown.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
