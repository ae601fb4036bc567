//! Domain records returned by the query endpoints.
//!
//! Several endpoints answer with parallel arrays keyed by account id
//! (`info`/`marknames`/`vipinfo`, `minfo`/`stats`/`cards`, ...); the stitch
//! helpers below fold those into single records, preserving the primary
//! array's order.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

/// A friend, assembled from the `info`/`marknames`/`vipinfo` arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Friend {
    pub user_id: i64,
    pub nickname: String,
    pub markname: Option<String>,
    pub vip: bool,
    pub vip_level: i64,
}

/// A friend-list category with its members.
#[derive(Debug, Clone, Default)]
pub struct Category {
    pub index: i64,
    pub name: String,
    pub friends: Vec<Friend>,
}

impl Category {
    /// The implicit category friends fall into when the server assigns none.
    #[must_use]
    pub fn default_category() -> Self {
        Self {
            index: 0,
            name: "我的好友".to_owned(),
            friends: Vec::new(),
        }
    }
}

/// A group, as listed by the group-name endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Group {
    pub gid: i64,
    pub code: i64,
    pub name: String,
}

/// A multi-user discussion, as listed by the discussion endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Discuss {
    pub did: i64,
    pub name: String,
}

/// Detailed group record, members stitched from the parallel arrays.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroupInfo {
    pub gid: i64,
    pub code: i64,
    pub name: String,
    pub owner: i64,
    pub memo: Option<String>,
    pub createtime: i64,
    #[serde(skip)]
    pub members: Vec<GroupUser>,
}

/// A group member.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroupUser {
    pub uin: i64,
    pub nick: String,
    pub province: String,
    pub country: String,
    pub city: String,
    pub gender: Option<String>,
    pub card: Option<String>,
    pub client_type: i64,
    pub status: i64,
    pub vip: bool,
    pub vip_level: i64,
}

/// Detailed discussion record, members stitched from the parallel arrays.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscussInfo {
    pub did: i64,
    #[serde(rename = "discu_name")]
    pub name: String,
    #[serde(skip)]
    pub members: Vec<DiscussUser>,
}

/// A discussion member.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscussUser {
    pub uin: i64,
    pub nick: String,
    pub ruin: i64,
    pub client_type: i64,
    pub status: String,
}

/// Detailed account record. The server omits fields freely.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub uin: i64,
    pub account: i64,
    pub nick: String,
    pub gender: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub college: String,
    pub occupation: String,
    pub personal: String,
    pub email: String,
    pub mobile: String,
    pub phone: String,
    pub homepage: String,
    pub shengxiao: i64,
    pub blood: i64,
    pub vip_info: i64,
}

/// One entry of the recent-conversation list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Recent {
    /// 0 friend, 1 group, 2 discussion.
    #[serde(rename = "type")]
    pub kind: i64,
    pub uin: i64,
}

/// Presence of one online friend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FriendStatus {
    pub uin: i64,
    pub status: String,
    pub client_type: i64,
}

/// Fold the `info`/`marknames`/`vipinfo` arrays of a friend-list result into
/// friends, in `info` order.
#[must_use]
pub fn parse_friends(result: &Value) -> Vec<Friend> {
    let mut order = Vec::new();
    let mut by_uin: HashMap<i64, Friend> = HashMap::new();
    for item in array(result, "info") {
        let Some(uin) = item.get("uin").and_then(Value::as_i64) else {
            continue;
        };
        order.push(uin);
        by_uin.insert(
            uin,
            Friend {
                user_id: uin,
                nickname: field_str(item, "nick"),
                ..Friend::default()
            },
        );
    }
    for item in array(result, "marknames") {
        let uin = item.get("uin").and_then(Value::as_i64);
        let markname = item.get("markname").and_then(Value::as_str);
        if let (Some(uin), Some(markname)) = (uin, markname) {
            if let Some(friend) = by_uin.get_mut(&uin) {
                friend.markname = Some(markname.to_owned());
            }
        }
    }
    for item in array(result, "vipinfo") {
        let Some(uin) = item.get("u").and_then(Value::as_i64) else {
            continue;
        };
        if let Some(friend) = by_uin.get_mut(&uin) {
            friend.vip = item.get("is_vip").and_then(Value::as_i64) == Some(1);
            friend.vip_level = item.get("vip_level").and_then(Value::as_i64).unwrap_or(0);
        }
    }
    order
        .into_iter()
        .filter_map(|uin| by_uin.remove(&uin))
        .collect()
}

/// Fold a friend-list result into its categories; friends the server leaves
/// unassigned (or assigns to an unknown category) land in the default one.
#[must_use]
pub fn parse_categories(result: &Value) -> Vec<Category> {
    let mut categories = vec![Category::default_category()];
    for item in array(result, "categories") {
        categories.push(Category {
            index: item.get("index").and_then(Value::as_i64).unwrap_or(0),
            name: field_str(item, "name"),
            friends: Vec::new(),
        });
    }
    let mut by_uin: HashMap<i64, Friend> = parse_friends(result)
        .into_iter()
        .map(|friend| (friend.user_id, friend))
        .collect();
    for item in array(result, "friends") {
        let Some(uin) = item.get("uin").and_then(Value::as_i64) else {
            continue;
        };
        let Some(friend) = by_uin.remove(&uin) else {
            continue;
        };
        let index = item.get("categories").and_then(Value::as_i64).unwrap_or(0);
        let slot = categories
            .iter()
            .position(|category| category.index == index)
            .unwrap_or(0);
        categories[slot].friends.push(friend);
    }
    categories
}

/// Parse a group-info result: the `ginfo` record plus members stitched from
/// `minfo`/`stats`/`cards`/`vipinfo`.
///
/// # Errors
///
/// Returns [`ApiError::Malformed`] when `ginfo` is absent or not a group
/// record.
pub fn parse_group_info(result: &Value) -> Result<GroupInfo, ApiError> {
    let mut info: GroupInfo =
        serde_json::from_value(result.get("ginfo").cloned().unwrap_or(Value::Null))?;
    let mut members: Vec<GroupUser> = Vec::new();
    let mut index_of: HashMap<i64, usize> = HashMap::new();
    for item in array(result, "minfo") {
        if let Ok(user) = serde_json::from_value::<GroupUser>(item.clone()) {
            index_of.insert(user.uin, members.len());
            members.push(user);
        }
    }
    for item in array(result, "stats") {
        if let Some(&slot) = item
            .get("uin")
            .and_then(Value::as_i64)
            .and_then(|uin| index_of.get(&uin))
        {
            members[slot].client_type = item.get("client_type").and_then(Value::as_i64).unwrap_or(0);
            members[slot].status = item.get("stat").and_then(Value::as_i64).unwrap_or(0);
        }
    }
    for item in array(result, "cards") {
        if let Some(&slot) = item
            .get("muin")
            .and_then(Value::as_i64)
            .and_then(|uin| index_of.get(&uin))
        {
            members[slot].card = item.get("card").and_then(Value::as_str).map(str::to_owned);
        }
    }
    for item in array(result, "vipinfo") {
        if let Some(&slot) = item
            .get("u")
            .and_then(Value::as_i64)
            .and_then(|uin| index_of.get(&uin))
        {
            members[slot].vip = item.get("is_vip").and_then(Value::as_i64) == Some(1);
            members[slot].vip_level = item.get("vip_level").and_then(Value::as_i64).unwrap_or(0);
        }
    }
    info.members = members;
    Ok(info)
}

/// Parse a discussion-info result: the `info` record plus members stitched
/// from `mem_info`/`mem_status`.
///
/// # Errors
///
/// Returns [`ApiError::Malformed`] when `info` is absent or not a
/// discussion record.
pub fn parse_discuss_info(result: &Value) -> Result<DiscussInfo, ApiError> {
    let mut info: DiscussInfo =
        serde_json::from_value(result.get("info").cloned().unwrap_or(Value::Null))?;
    let mut members: Vec<DiscussUser> = Vec::new();
    let mut index_of: HashMap<i64, usize> = HashMap::new();
    for item in array(result, "mem_info") {
        if let Ok(user) = serde_json::from_value::<DiscussUser>(item.clone()) {
            index_of.insert(user.uin, members.len());
            members.push(user);
        }
    }
    for item in array(result, "mem_status") {
        if let Some(&slot) = item
            .get("uin")
            .and_then(Value::as_i64)
            .and_then(|uin| index_of.get(&uin))
        {
            members[slot].client_type = item.get("client_type").and_then(Value::as_i64).unwrap_or(0);
            members[slot].status = field_str(item, "status");
        }
    }
    info.members = members;
    Ok(info)
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value.get(key).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

fn field_str(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}
