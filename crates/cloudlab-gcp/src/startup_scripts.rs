//! Boot-time payloads for lab instances
//!
//! Attached verbatim as `startup-script` metadata; the instance runs them as
//! root on first boot.

/// Web responder template; `{{REGION}}` is replaced per instance
const WEB_RESPONDER: &str = r#"#!/bin/bash
# geo-lab web responder

set -e

apt-get update -y
apt-get install -y apache2

cat > /var/www/html/index.html <<HTML
<h1>geo-lab: served from {{REGION}}</h1>
<p>host: $(hostname)</p>
HTML

systemctl enable apache2
systemctl restart apache2
"#;

/// Installs apache and serves a page naming `region`
pub fn web_responder(region: &str) -> String {
    WEB_RESPONDER.replace("{{REGION}}", region)
}
