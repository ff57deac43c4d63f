use super::model::{CleanupRule, RiskLevel};

/// Built-in rule catalogue, in declaration order.
pub fn builtin_rules() -> Vec<CleanupRule> {
    use RiskLevel::{Low, Medium};

    vec![
        // Xcode
        CleanupRule::glob(
            "xcode.deriveddata",
            "Xcode DerivedData",
            "**/Library/Developer/Xcode/DerivedData",
            Low,
            550,
        ),
        CleanupRule::glob(
            "xcode.archives",
            "Xcode Archives",
            "**/Library/Developer/Xcode/Archives",
            Medium,
            520,
        ),
        CleanupRule::glob(
            "xcode.ios_devicesupport",
            "iOS DeviceSupport",
            "**/Library/Developer/Xcode/iOS DeviceSupport",
            Low,
            510,
        ),
        // Node
        CleanupRule::glob("node_modules", "node_modules", "**/node_modules", Medium, 450),
        CleanupRule::glob("npm_cache", "NPM Cache", "**/.npm", Low, 420),
        // Python
        CleanupRule::glob("python.venv", "Python venv (.venv)", "**/.venv", Medium, 440),
        CleanupRule::glob("python.venv2", "Python venv (venv)", "**/venv", Medium, 439),
        CleanupRule::glob("python.pycache", "Python __pycache__", "**/__pycache__", Low, 410),
        // Ruby
        CleanupRule::glob("ruby.gems_cache", "Ruby Gems Cache", "**/.gem", Low, 420),
        // Homebrew
        CleanupRule::glob(
            "homebrew.cache",
            "Homebrew Cache",
            "**/Library/Caches/Homebrew",
            Low,
            380,
        ),
        CleanupRule::glob(
            "homebrew.logs",
            "Homebrew Logs",
            "**/Library/Logs/Homebrew",
            Low,
            370,
        ),
        // CocoaPods
        CleanupRule::glob(
            "cocoapods.cache",
            "CocoaPods Cache",
            "**/Library/Caches/CocoaPods",
            Low,
            410,
        ),
        // Browsers
        CleanupRule::glob(
            "browser.safari_cache",
            "Safari Cache",
            "**/Library/Caches/com.apple.Safari",
            Low,
            320,
        ),
        CleanupRule::glob(
            "browser.chrome_cache",
            "Chrome Cache",
            "**/Library/Caches/Google/Chrome",
            Low,
            310,
        ),
        // Generic user locations
        CleanupRule::glob("user.caches", "User Caches", "**/Library/Caches", Low, 200),
        CleanupRule::glob("user.logs", "User Logs", "**/Library/Logs", Low, 190),
    ]
}
