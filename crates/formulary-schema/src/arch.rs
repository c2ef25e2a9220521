//! Target platform detection.
//!
//! Release artifacts name their target in the file name, e.g.
//! `ecsfgrun_Darwin_x86_64.tar.gz`. The types here recover that target so
//! it can be shown to the user and compared with the host.

/// CPU architecture an artifact was built for.
///
/// # Example
///
/// ```
/// use formulary_schema::Arch;
///
/// let current = Arch::current();
/// println!("Running on: {}", current);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// ARM64 architecture (Apple Silicon, Graviton, ...)
    Arm64,
    /// `x86_64` architecture
    #[default]
    X86_64,
    /// 32-bit x86
    I386,
    /// Universal binary (works on both ARM64 and `x86_64`)
    Universal,
}

impl Arch {
    /// Get the current architecture
    pub fn current() -> Self {
        #[cfg(target_arch = "aarch64")]
        {
            Self::Arm64
        }
        #[cfg(target_arch = "x86")]
        {
            Self::I386
        }
        #[cfg(not(any(target_arch = "aarch64", target_arch = "x86")))]
        {
            Self::X86_64
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
            Self::I386 => "i386",
            Self::Universal => "universal",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "x86_64" | "amd64" | "x64" => Ok(Self::X86_64),
            "i386" | "386" | "x86" => Ok(Self::I386),
            "universal" | "all" => Ok(Self::Universal),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

/// Operating system an artifact was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// macOS
    Darwin,
    /// Linux
    Linux,
    /// Windows
    Windows,
}

impl Os {
    /// Get the current operating system, if it is one artifacts are built for.
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "macos" => Some(Self::Darwin),
            "linux" => Some(Self::Linux),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "darwin" | "macos" | "osx" => Ok(Self::Darwin),
            "linux" => Ok(Self::Linux),
            "windows" | "win" => Ok(Self::Windows),
            _ => Err(format!("Unknown operating system: {s}")),
        }
    }
}

/// An (OS, architecture) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Platform {
    /// Target operating system.
    pub os: Os,
    /// Target CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// The host platform, when its OS is a known artifact target.
    pub fn current() -> Option<Self> {
        Os::current().map(|os| Self {
            os,
            arch: Arch::current(),
        })
    }

    /// Recover the target platform from an artifact URL or file name.
    ///
    /// The file name is split on `_`, `-` and `.`; the first token naming an
    /// OS and the first naming an architecture are used. `x86_64` is joined
    /// back together before matching since it contains the separator.
    pub fn from_artifact_name(url: &str) -> Option<Self> {
        let file = url.rsplit('/').next().unwrap_or(url).replace("x86_64", "x64");
        let mut os = None;
        let mut arch = None;
        for token in file.split(['_', '-', '.']) {
            if os.is_none() {
                os = token.parse::<Os>().ok();
            }
            if arch.is_none() {
                arch = token.parse::<Arch>().ok();
            }
        }
        Some(Self {
            os: os?,
            arch: arch?,
        })
    }

    /// Whether an artifact for this platform runs on `host`.
    pub fn runs_on(&self, host: &Platform) -> bool {
        self.os == host.os
            && (self.arch == host.arch
                || self.arch == Arch::Universal
                || (self.os == Os::Darwin && self.arch == Arch::X86_64 && host.arch == Arch::Arm64))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_from_goreleaser_name() {
        let p = Platform::from_artifact_name(
            "https://github.com/masahide/ecsfgrun/releases/download/v0.4.0/ecsfgrun_Darwin_x86_64.tar.gz",
        )
        .unwrap();
        assert_eq!(p.os, Os::Darwin);
        assert_eq!(p.arch, Arch::X86_64);
        assert_eq!(p.to_string(), "darwin/x86_64");
    }

    #[test]
    fn platform_from_dashed_name() {
        let p = Platform::from_artifact_name("tool-1.0.0-linux-arm64.zip").unwrap();
        assert_eq!(p.os, Os::Linux);
        assert_eq!(p.arch, Arch::Arm64);
    }

    #[test]
    fn platform_missing_parts() {
        assert!(Platform::from_artifact_name("tool.tar.gz").is_none());
        assert!(Platform::from_artifact_name("tool_Darwin.tar.gz").is_none());
    }

    #[test]
    fn rosetta_compat() {
        let intel_mac = Platform {
            os: Os::Darwin,
            arch: Arch::X86_64,
        };
        let arm_mac = Platform {
            os: Os::Darwin,
            arch: Arch::Arm64,
        };
        let arm_linux = Platform {
            os: Os::Linux,
            arch: Arch::Arm64,
        };
        assert!(intel_mac.runs_on(&arm_mac));
        assert!(!arm_mac.runs_on(&intel_mac));
        assert!(!intel_mac.runs_on(&arm_linux));
    }
}
