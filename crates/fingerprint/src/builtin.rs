//! Built-in WAF signature table
//!
//! Declaration order is significant: it breaks score ties in reports.
//! Patterns are case-insensitive regular expressions. Header and cookie
//! patterns see the lower-cased `"name: value"` header text.

pub(crate) struct BuiltinSignature {
    pub name: &'static str,
    pub headers: &'static [&'static str],
    pub cookies: &'static [&'static str],
    pub body: &'static [&'static str],
    pub status_codes: &'static [u16],
}

pub(crate) const BUILTIN_SIGNATURES: &[BuiltinSignature] = &[
    BuiltinSignature {
        name: "Cloudflare",
        headers: &[r"server:\s*cloudflare", r"cf-ray", r"cf-edge-cache"],
        cookies: &[r"__cfduid", r"__cf_bm"],
        body: &[r"Attention Required!|checking your browser|Cloudflare"],
        status_codes: &[],
    },
    BuiltinSignature {
        name: "Akamai",
        headers: &[r"server:\s*akamai", r"x-akamai-transformed"],
        cookies: &[r"aka_debug", r"akamai"],
        body: &[r"Reference ID: "],
        status_codes: &[],
    },
    BuiltinSignature {
        name: "AWS WAF / ALB",
        headers: &[r"server:\s*awselb", r"via: .*cloudfront"],
        cookies: &[],
        body: &[r"blocked by AWS WAF", r"AWS WAF"],
        status_codes: &[],
    },
    BuiltinSignature {
        name: "ModSecurity",
        headers: &[r"mod_security", r"mod_security2", r"mod_security_nginx"],
        cookies: &[],
        body: &[r"Mod_Security|Access denied with code 403"],
        status_codes: &[],
    },
    BuiltinSignature {
        name: "F5 BIG-IP ASM",
        headers: &[r"BIGipServer", r"X-F5-"],
        // TS cookies, e.g. TS01a2b3c4
        cookies: &[r"TS[0-9a-zA-Z_-]{6,}"],
        body: &[r"Access Denied - F5"],
        status_codes: &[],
    },
];
