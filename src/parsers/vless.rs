//! `vless://uuid@host:port?params#remark`

use crate::error::LinkError;
use crate::node::{defaults, Credential, ParsedNode};

use super::{validate_user_id, UriParts};

pub fn parse(link: &str) -> Result<ParsedNode, LinkError> {
  let u = UriParts::parse(link)?;
  let id = validate_user_id("id", &u.user)?;
  let params = u.link_params();

  let transport = params.transport(&u.host)?;
  let security = params.security(&u.host, defaults::SECURITY)?;

  Ok(ParsedNode {
    remark: u.remark_or_host(),
    credential: Credential::Vless {
      id,
      encryption: params
        .encryption
        .clone()
        .unwrap_or_else(|| defaults::VLESS_ENCRYPTION.to_string()),
      flow: params.flow.clone(),
    },
    address: u.host,
    port: u.port,
    transport,
    security,
  })
}
