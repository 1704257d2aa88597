//! Platform matrix resolution.
//!
//! Expands the platforms a project declares and its host architecture
//! preference into concrete build contexts.

use std::path::Path;

use tracing::debug;

use crate::core::platform::{Arch, HostArch, PlatformContext, Sdk, XcodeTarget};

/// Expand platform intents into an ordered list of contexts.
///
/// iOS always gets a device context (arm64, iphoneos) and, when the host
/// preference names an architecture, one simulator context. macOS gets a
/// single context following the preference. iOS contexts precede macOS
/// ones regardless of declaration order. Other targets produce nothing.
pub fn resolve_platforms(
    platforms: &[XcodeTarget],
    host: HostArch,
    root: &Path,
) -> Vec<PlatformContext> {
    let mut contexts = Vec::new();

    if platforms.contains(&XcodeTarget::Ios) {
        contexts.push(PlatformContext::new(Arch::Arm64, Sdk::IphoneOs, root));
        if let Some(arch) = host.arch() {
            contexts.push(PlatformContext::new(arch, Sdk::IphoneSimulator, root));
        }
    }

    if platforms.contains(&XcodeTarget::MacOs) {
        if let Some(arch) = host.arch() {
            contexts.push(PlatformContext::new(arch, Sdk::MacOs, root));
        } else {
            debug!("arch_info is auto, no macOS context resolved");
        }
    }

    for skipped in platforms
        .iter()
        .filter(|p| !matches!(p, XcodeTarget::Ios | XcodeTarget::MacOs))
    {
        debug!("no build contexts for {}", skipped);
    }

    contexts
}

/// Group contexts by target classification, keeping their order.
pub fn chunk_by_target(contexts: &[PlatformContext]) -> Vec<(XcodeTarget, Vec<PlatformContext>)> {
    let mut chunks: Vec<(XcodeTarget, Vec<PlatformContext>)> = Vec::new();
    for ctx in contexts {
        match chunks.iter_mut().find(|(t, _)| *t == ctx.target()) {
            Some((_, members)) => members.push(ctx.clone()),
            None => chunks.push((ctx.target(), vec![ctx.clone()])),
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> &'static Path {
        Path::new("/proj/project_dist/xcode")
    }

    #[test]
    fn test_ios_arm64() {
        let contexts = resolve_platforms(&[XcodeTarget::Ios], HostArch::Arm64, root());
        let names: Vec<_> = contexts.iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["iphoneos-arm64", "iphonesimulator-arm64"]);
        assert_eq!(
            contexts[1].site_packages(),
            root().join("site_packages.iphonesimulator")
        );
    }

    #[test]
    fn test_macos_intel() {
        let contexts = resolve_platforms(&[XcodeTarget::MacOs], HostArch::Intel64, root());
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].arch(), Arch::X86_64);
        assert_eq!(contexts[0].wheel_platform(), "macosx_11_0_x86_64");
    }

    #[test]
    fn test_auto_yields_device_only() {
        let contexts = resolve_platforms(
            &[XcodeTarget::MacOs, XcodeTarget::Ios],
            HostArch::Auto,
            root(),
        );
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].sdk(), Sdk::IphoneOs);
    }

    #[test]
    fn test_ios_before_macos_and_placeholders() {
        let contexts = resolve_platforms(
            &[XcodeTarget::MacOs, XcodeTarget::VisionOs, XcodeTarget::Ios],
            HostArch::Arm64,
            root(),
        );
        let targets: Vec<_> = contexts.iter().map(|c| c.target()).collect();
        assert_eq!(
            targets,
            vec![XcodeTarget::Ios, XcodeTarget::Ios, XcodeTarget::MacOs]
        );
        assert!(resolve_platforms(&[], HostArch::Arm64, root()).is_empty());
    }

    #[test]
    fn test_chunk_by_target() {
        let contexts = resolve_platforms(
            &[XcodeTarget::Ios, XcodeTarget::MacOs],
            HostArch::Arm64,
            root(),
        );
        let chunks = chunk_by_target(&contexts);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].0, XcodeTarget::Ios);
        assert_eq!(chunks[0].1.len(), 2);
        assert_eq!(chunks[1].1[0].sdk(), Sdk::MacOs);
    }
}
