//! REST endpoint catalog.
//!
//! URL templates use `{}` placeholders filled positionally. Each endpoint
//! carries the Referer the browser client presents when calling it; the
//! Origin header for POSTs is derived from the endpoint URL.

/// Referer presented to the s.web2.qq.com API endpoints.
const REFERER_S: &str = "http://s.web2.qq.com/proxy.html?v=20130916001&callback=1&id=1";

/// Referer presented to the d1.web2.qq.com channel endpoints.
const REFERER_D: &str = "http://d1.web2.qq.com/proxy.html?v=20151105001&callback=1&id=2";

/// Referer presented during the login handshake.
const REFERER_W: &str = "http://w.qq.com/";

/// One REST endpoint: a URL template and the Referer it is called with.
#[derive(Debug, Clone, Copy)]
pub struct ApiUrl {
    template: &'static str,
    referer: Option<&'static str>,
}

impl ApiUrl {
    const fn new(template: &'static str, referer: Option<&'static str>) -> Self {
        Self { template, referer }
    }

    /// The raw template (also the full URL for endpoints without
    /// placeholders).
    #[must_use]
    pub const fn url(&self) -> &'static str {
        self.template
    }

    /// Fill the `{}` placeholders positionally.
    #[must_use]
    pub fn with(&self, args: &[&dyn std::fmt::Display]) -> String {
        let mut out = String::with_capacity(self.template.len() + args.len() * 16);
        let mut args = args.iter();
        let mut parts = self.template.split("{}").peekable();
        while let Some(part) = parts.next() {
            out.push_str(part);
            if parts.peek().is_some() {
                if let Some(arg) = args.next() {
                    out.push_str(&arg.to_string());
                }
            }
        }
        out
    }

    /// The Referer header value for this endpoint, when it carries one.
    #[must_use]
    pub const fn referer(&self) -> Option<&'static str> {
        self.referer
    }

    /// The Origin a browser would send with a POST to this endpoint:
    /// scheme and authority of the URL.
    #[must_use]
    pub fn origin(&self) -> &'static str {
        let template = self.template;
        let authority_start = match template.find("//") {
            Some(position) => position + 2,
            None => return template,
        };
        match template[authority_start..].find('/') {
            Some(path) => &template[..authority_start + path],
            None => template,
        }
    }
}

/// Portal page fetched once before the QR challenge to seed cookies.
pub const HOME_PAGE: ApiUrl = ApiUrl::new("http://w.qq.com/", None);

/// QR challenge image.
pub const GET_QR_CODE: ApiUrl = ApiUrl::new(
    "https://ssl.ptlogin2.qq.com/ptqrshow?appid=501004106&e=0&l=M&s=5&d=72&v=4&t=0.1",
    None,
);

/// QR confirmation endpoint, polled once per second during login.
pub const VERIFY_QR_CODE: ApiUrl = ApiUrl::new(
    "https://ssl.ptlogin2.qq.com/ptqrlogin?webqq_type=10&remember_uin=1&login2qq=1&aid=501004106&u1=http%3A%2F%2Fw.qq.com%2Fproxy.html%3Flogin2qq%3D1%26webqq_type%3D10&ptredirect=0&ptlang=2052&daid=164&from_ui=1&pttype=1&dumy=&fp=loginerroralert&action=0-0-157510&mibao_css=m_webqq&t=1&g=1&js_type=0&js_ver=10143&login_sig=&pt_randsalt=0",
    Some("https://ui.ptlogin2.qq.com/cgi-bin/login?daid=164&target=self&style=16&mibao_css=m_webqq&appid=501004106&enable_qlogin=0&no_verifyimg=1&s_url=http%3A%2F%2Fw.qq.com%2Fproxy.html&f_url=loginerroralert&strong_login=1&login_state=10&t=20131024001"),
);

/// Login page warm-up GET issued before the session exchange.
pub const LOGIN_PAGE: ApiUrl = ApiUrl::new(
    "https://ui.ptlogin2.qq.com/cgi-bin/login?daid=164&target=self&style=16&mibao_css=m_webqq&appid=501004106&enable_qlogin=0&no_verifyimg=1&s_url=http%3A%2F%2Fw.qq.com%2Fproxy.html&f_url=loginerroralert&strong_login=1&login_state=10&t=20131024001",
    Some(REFERER_W),
);

/// Channel proxy page warm-up GET issued before the session exchange.
pub const PROXY_PAGE: ApiUrl = ApiUrl::new(
    "http://d1.web2.qq.com/proxy.html?v=20151105001&callback=1&id=2",
    Some(REFERER_W),
);

/// Trades the `ptwebqq` token for the `vfwebqq` token.
pub const GET_VFWEBQQ: ApiUrl = ApiUrl::new(
    "http://s.web2.qq.com/api/getvfwebqq?ptwebqq={}&clientid=53999199&psessionid=&t=0.1",
    Some(REFERER_S),
);

/// Trades the token set for `psessionid` and `uin`.
pub const GET_UIN_AND_PSESSIONID: ApiUrl =
    ApiUrl::new("http://d1.web2.qq.com/channel/login2", Some(REFERER_D));

/// Primes server-side polling state; skipping it earns return code 103 on
/// the first poll.
pub const AVOID_RETCODE_103: ApiUrl = ApiUrl::new(
    "http://d1.web2.qq.com/channel/get_online_buddies2?vfwebqq={}&clientid={}&psessionid={}&t=0.1",
    Some(REFERER_D),
);

/// The long-poll message channel.
pub const POLL_MESSAGE: ApiUrl =
    ApiUrl::new("http://d1.web2.qq.com/channel/poll2", Some(REFERER_D));

pub const SEND_MESSAGE_TO_FRIEND: ApiUrl =
    ApiUrl::new("http://d1.web2.qq.com/channel/send_buddy_msg2", Some(REFERER_D));

pub const SEND_MESSAGE_TO_GROUP: ApiUrl =
    ApiUrl::new("http://d1.web2.qq.com/channel/send_qun_msg2", Some(REFERER_D));

pub const SEND_MESSAGE_TO_DISCUSS: ApiUrl =
    ApiUrl::new("http://d1.web2.qq.com/channel/send_discu_msg2", Some(REFERER_D));

pub const GET_FRIEND_LIST: ApiUrl =
    ApiUrl::new("http://s.web2.qq.com/api/get_user_friends2", Some(REFERER_S));

pub const GET_GROUP_LIST: ApiUrl = ApiUrl::new(
    "http://s.web2.qq.com/api/get_group_name_list_mask2",
    Some(REFERER_S),
);

pub const GET_DISCUSS_LIST: ApiUrl = ApiUrl::new(
    "http://s.web2.qq.com/api/get_discus_list?clientid=53999199&psessionid={}&vfwebqq={}&t=0.1",
    Some(REFERER_S),
);

pub const GET_ACCOUNT_INFO: ApiUrl =
    ApiUrl::new("http://s.web2.qq.com/api/get_self_info2?t=0.1", Some(REFERER_S));

pub const GET_FRIEND_INFO: ApiUrl = ApiUrl::new(
    "http://s.web2.qq.com/api/get_friend_info2?tuin={}&vfwebqq={}&clientid=53999199&psessionid={}&t=0.1",
    Some(REFERER_S),
);

pub const GET_GROUP_INFO: ApiUrl = ApiUrl::new(
    "http://s.web2.qq.com/api/get_group_info_ext2?gcode={}&vfwebqq={}&t=0.1",
    Some(REFERER_S),
);

pub const GET_DISCUSS_INFO: ApiUrl = ApiUrl::new(
    "http://s.web2.qq.com/api/get_discu_info?did={}&vfwebqq={}&clientid=53999199&psessionid={}&t=0.1",
    Some(REFERER_S),
);

pub const GET_RECENT_LIST: ApiUrl = ApiUrl::new(
    "http://d1.web2.qq.com/channel/get_recent_list2",
    Some(REFERER_D),
);

pub const GET_FRIEND_STATUS: ApiUrl = ApiUrl::new(
    "http://d1.web2.qq.com/channel/get_online_buddies2?vfwebqq={}&clientid=53999199&psessionid={}&t=0.1",
    Some(REFERER_D),
);

pub const GET_QQ_BY_ID: ApiUrl = ApiUrl::new(
    "http://s.web2.qq.com/api/get_friend_uin2?tuin={}&type=1&vfwebqq={}&t=0.1",
    Some(REFERER_S),
);

pub const CHANGE_STATUS: ApiUrl = ApiUrl::new(
    "http://d1.web2.qq.com/channel/change_status2?newstatus={}&clientid=53999199&psessionid={}&t=0.1",
    Some(REFERER_D),
);

/// Avatar image; the leading placeholder selects one of the `face0`-`face9`
/// mirror hosts.
pub const GET_USER_FACE: ApiUrl = ApiUrl::new(
    "http://face{}.qun.qq.com/cgi/svr/face/getface?cache=0&type=1&fid=0&uin={}&vfwebqq={}",
    Some(REFERER_S),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_fill_positionally() {
        let url = GET_FRIEND_INFO.with(&[&42, &"vf", &"ps"]);
        assert_eq!(
            url,
            "http://s.web2.qq.com/api/get_friend_info2?tuin=42&vfwebqq=vf&clientid=53999199&psessionid=ps&t=0.1"
        );
    }

    #[test]
    fn missing_args_leave_placeholder_empty() {
        let url = GET_GROUP_INFO.with(&[&7]);
        assert_eq!(
            url,
            "http://s.web2.qq.com/api/get_group_info_ext2?gcode=7&vfwebqq=&t=0.1"
        );
    }

    #[test]
    fn origin_is_scheme_and_authority() {
        assert_eq!(POLL_MESSAGE.origin(), "http://d1.web2.qq.com");
        assert_eq!(GET_QR_CODE.origin(), "https://ssl.ptlogin2.qq.com");
    }

    #[test]
    fn template_without_placeholders_is_returned_verbatim() {
        assert_eq!(POLL_MESSAGE.with(&[]), POLL_MESSAGE.url());
    }
}
