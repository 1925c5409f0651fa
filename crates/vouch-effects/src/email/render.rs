//! Invitation e-mail rendering

use vouch_core::{InvitationToken, InvitationType, OrganizationId};

/// Inputs for rendering an invitation e-mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationEmailParams {
    /// Product name shown in the subject
    pub product_name: String,
    /// `From` address
    pub from_addr: String,
    /// Recipient
    pub to_addr: String,
    /// Greeter address for replies (user invitations only)
    pub reply_to: Option<String>,
    /// Greeter display name; `None` for device invitations
    pub greeter_name: Option<String>,
    /// Organization the claimer is invited to
    pub organization_id: OrganizationId,
    /// Link that starts the claim
    pub invitation_url: String,
    /// Server home page
    pub server_url: String,
}

/// Rendered invitation e-mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationEmail {
    /// `From` address
    pub from: String,
    /// Recipient
    pub to: String,
    /// `Reply-To`, if any
    pub reply_to: Option<String>,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text: String,
    /// HTML body
    pub html: String,
}

impl InvitationEmail {
    /// Render an invitation e-mail
    ///
    /// A `Reply-To` is only set when both a greeter name and a reply address
    /// are known, which is the case for user invitations.
    pub fn render(params: InvitationEmailParams) -> Self {
        let server_url = params.server_url.trim_end_matches('/');
        let org = params.organization_id.as_str();

        let subject = match &params.greeter_name {
            Some(greeter) => format!("[{}] {greeter} invited you to {org}", params.product_name),
            None => format!("[{}] New device invitation to {org}", params.product_name),
        };

        let text = match &params.greeter_name {
            Some(greeter) => format!(
                "You have received an invitation from {greeter} to join the {org} organization.\n\n\
                 Click the link below to accept it:\n{url}\n\n\
                 More information: {server_url}\n",
                url = params.invitation_url,
            ),
            None => format!(
                "You have received an invitation to add a new device to the {org} organization.\n\n\
                 Click the link below to accept it:\n{url}\n\n\
                 More information: {server_url}\n",
                url = params.invitation_url,
            ),
        };

        let lead = match &params.greeter_name {
            Some(greeter) => format!(
                "You have received an invitation from <b>{}</b> to join the <b>{}</b> organization.",
                escape_html(greeter),
                escape_html(org)
            ),
            None => format!(
                "You have received an invitation to add a new device to the <b>{}</b> organization.",
                escape_html(org)
            ),
        };
        let html = format!(
            "<html><body>\n<p>{lead}</p>\n<p><a href=\"{url}\">Accept the invitation</a></p>\n\
             <p><a href=\"{server}\">{server}</a></p>\n</body></html>\n",
            url = escape_html(&params.invitation_url),
            server = escape_html(server_url),
        );

        let reply_to = match (&params.greeter_name, params.reply_to) {
            (Some(greeter), Some(addr)) => Some(format!("{greeter} <{addr}>")),
            _ => None,
        };

        Self {
            from: params.from_addr,
            to: params.to_addr,
            reply_to,
            subject,
            text,
            html,
        }
    }

    /// Serialize as a `multipart/alternative` message
    pub fn to_mime(&self, boundary: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str(&format!("To: {}\r\n", self.to));
        if let Some(reply_to) = &self.reply_to {
            out.push_str(&format!("Reply-To: {reply_to}\r\n"));
        }
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str(&format!(
            "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
        ));
        // Clients render the last alternative they support, so HTML goes last
        for (content_type, body) in [("text/plain", &self.text), ("text/html", &self.html)] {
            out.push_str(&format!("--{boundary}\r\n"));
            out.push_str(&format!("Content-Type: {content_type}; charset=\"utf-8\"\r\n\r\n"));
            out.push_str(body);
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{boundary}--\r\n"));
        out
    }
}

/// Build the link a claimer follows to start claiming an invitation
pub fn invitation_url(
    server_url: &str,
    organization_id: &OrganizationId,
    invitation_type: InvitationType,
    token: InvitationToken,
) -> String {
    let action = match invitation_type {
        InvitationType::User => "claim_user_invitation",
        InvitationType::Device => "claim_device_invitation",
    };
    format!(
        "{}/redirect/{}?action={action}&token={}",
        server_url.trim_end_matches('/'),
        organization_id.as_str(),
        token.hex(),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(greeter: Option<&str>) -> InvitationEmailParams {
        InvitationEmailParams {
            product_name: "Vouch".into(),
            from_addr: "no-reply@example.com".into(),
            to_addr: "zack@example.com".into(),
            reply_to: Some("alice@example.com".into()),
            greeter_name: greeter.map(str::to_string),
            organization_id: OrganizationId::new("CoolOrg"),
            invitation_url: "https://vouch.example.com/redirect/CoolOrg?token=abc".into(),
            server_url: "https://vouch.example.com/".into(),
        }
    }

    #[test]
    fn user_invitation_subject_names_the_greeter() {
        let email = InvitationEmail::render(params(Some("Alicey McAliceFace")));
        assert_eq!(email.subject, "[Vouch] Alicey McAliceFace invited you to CoolOrg");
        assert_eq!(
            email.reply_to.as_deref(),
            Some("Alicey McAliceFace <alice@example.com>")
        );
        assert!(email.text.contains("https://vouch.example.com/redirect/CoolOrg?token=abc"));
        assert!(email.text.contains("More information: https://vouch.example.com\n"));
    }

    #[test]
    fn device_invitation_has_no_reply_to() {
        let email = InvitationEmail::render(params(None));
        assert_eq!(email.subject, "[Vouch] New device invitation to CoolOrg");
        assert_eq!(email.reply_to, None);
    }

    #[test]
    fn html_body_escapes_greeter_name() {
        let email = InvitationEmail::render(params(Some("<script>")));
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(!email.html.contains("<script>"));
    }

    #[test]
    fn mime_puts_html_last() {
        let mime = InvitationEmail::render(params(Some("Alice"))).to_mime("BOUNDARY");
        let text_at = mime.find("text/plain").unwrap();
        let html_at = mime.find("text/html").unwrap();
        assert!(text_at < html_at);
        assert!(mime.ends_with("--BOUNDARY--\r\n"));
    }

    #[test]
    fn invitation_url_strips_trailing_slash() {
        let token = InvitationToken::new();
        let url = invitation_url(
            "https://vouch.example.com/",
            &OrganizationId::new("CoolOrg"),
            InvitationType::Device,
            token,
        );
        assert_eq!(
            url,
            format!(
                "https://vouch.example.com/redirect/CoolOrg?action=claim_device_invitation&token={token}"
            )
        );
        let carried = url.rsplit("token=").next().unwrap();
        assert_eq!(carried.len(), 32);
        assert!(!carried.contains('-'));
    }
}
