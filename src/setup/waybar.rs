//! Waybar configuration generation for voxtype

use super::{print_failure, print_info, print_success};
use std::path::PathBuf;

const MARKER_BEGIN: &str = "/* voxtype:begin */";
const MARKER_END: &str = "/* voxtype:end */";

fn waybar_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.config_dir().join("waybar"))
        .unwrap_or_else(|| PathBuf::from("~/.config/waybar"))
}

fn style_css_path() -> PathBuf {
    waybar_dir().join("style.css")
}

/// Append the module's CSS between marker comments in `style.css`, or
/// update it in place if already present. Leaves the rest of the user's
/// stylesheet untouched.
pub fn install() -> anyhow::Result<()> {
    println!("Installing Waybar integration...\n");

    let css_path = style_css_path();
    let block = format!("{}\n{}\n{}\n", MARKER_BEGIN, get_css_config(), MARKER_END);

    std::fs::create_dir_all(waybar_dir())?;
    let existing = std::fs::read_to_string(&css_path).unwrap_or_default();

    let updated = if let (Some(start), Some(end)) =
        (existing.find(MARKER_BEGIN), existing.find(MARKER_END))
    {
        let mut s = existing.clone();
        s.replace_range(start..end + MARKER_END.len(), block.trim_end());
        s
    } else {
        format!("{}\n{}", existing.trim_end(), block)
    };

    std::fs::write(&css_path, updated)?;
    print_success(&format!("Wrote module CSS to {:?}", css_path));

    print_info("Add \"custom/voxtype\" to modules-right (or left/center) in config:");
    println!("{}", get_json_config());
    print_info("Then reload Waybar: killall waybar && waybar &");

    Ok(())
}

/// Remove the marker-delimited block this module added to `style.css`.
pub fn uninstall() -> anyhow::Result<()> {
    println!("Removing Waybar integration...\n");

    let css_path = style_css_path();
    let Ok(existing) = std::fs::read_to_string(&css_path) else {
        print_info("style.css not found, nothing to remove");
        return Ok(());
    };

    let (Some(start), Some(end)) = (existing.find(MARKER_BEGIN), existing.find(MARKER_END)) else {
        print_info("No voxtype block found in style.css");
        return Ok(());
    };

    let mut updated = existing;
    updated.replace_range(start..end + MARKER_END.len(), "");
    match std::fs::write(&css_path, updated) {
        Ok(()) => print_success(&format!("Removed voxtype block from {:?}", css_path)),
        Err(e) => print_failure(&format!("Failed to update {:?}: {}", css_path, e)),
    }

    Ok(())
}

/// Generate and print Waybar configuration
pub fn print_config() {
    println!("Waybar Configuration for Voxtype\n");
    println!("================================\n");

    println!("1. Add this to your Waybar config (usually ~/.config/waybar/config):\n");
    println!("   In the \"modules-right\" (or left/center) array, add: \"custom/voxtype\"\n");

    println!("   Then add this module configuration:\n");
    println!(r#"   "custom/voxtype": {{
       "exec": "voxtype status --follow --format json",
       "return-type": "json",
       "format": "{{}}",
       "tooltip": true,
       "on-click": "systemctl --user restart voxtype"
   }}"#);

    println!("\n\n2. Add this to your Waybar style.css:\n");
    println!(
        r#"   #custom-voxtype {{
       padding: 0 10px;
   }}

   #custom-voxtype.recording {{
       color: #ff5555;
       animation: pulse 1s ease-in-out infinite;
   }}

   #custom-voxtype.transcribing {{
       color: #f1fa8c;
   }}

   #custom-voxtype.idle {{
       color: #50fa7b;
   }}

   #custom-voxtype.stopped {{
       color: #6272a4;
   }}

   @keyframes pulse {{
       0%, 100% {{ opacity: 1; }}
       50% {{ opacity: 0.5; }}
   }}"#
    );

    println!("\n3. Restart Waybar to apply changes:\n");
    println!("   killall waybar && waybar &\n");

    println!("---");
    println!("\nFor more details, see: https://voxtype.io or docs/WAYBAR.md");
}

/// Generate just the JSON config snippet (for programmatic use)
pub fn get_json_config() -> &'static str {
    r#""custom/voxtype": {
    "exec": "voxtype status --follow --format json",
    "return-type": "json",
    "format": "{}",
    "tooltip": true,
    "on-click": "systemctl --user restart voxtype"
}"#
}

/// Generate just the CSS snippet (for programmatic use)
pub fn get_css_config() -> &'static str {
    r#"#custom-voxtype {
    padding: 0 10px;
}

#custom-voxtype.recording {
    color: #ff5555;
    animation: pulse 1s ease-in-out infinite;
}

#custom-voxtype.transcribing {
    color: #f1fa8c;
}

#custom-voxtype.idle {
    color: #50fa7b;
}

#custom-voxtype.stopped {
    color: #6272a4;
}

@keyframes pulse {
    0%, 100% { opacity: 1; }
    50% { opacity: 0.5; }
}"#
}
