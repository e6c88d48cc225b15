use crate::errors::AppError;
use std::fmt;
use std::str::FromStr;

/// Tables present in a Stack Exchange data dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Badges,
    Posts,
    Tags,
    Votes,
    PostLinks,
    PostHistory,
    Comments,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Users,
        Table::Badges,
        Table::Posts,
        Table::Tags,
        Table::Votes,
        Table::PostLinks,
        Table::PostHistory,
        Table::Comments,
    ];

    /// Returns the table name as used in SQL statements and file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Badges => "Badges",
            Self::Posts => "Posts",
            Self::Tags => "Tags",
            Self::Votes => "Votes",
            Self::PostLinks => "PostLinks",
            Self::PostHistory => "PostHistory",
            Self::Comments => "Comments",
        }
    }

    /// Returns the column template: the positional order of values in every
    /// generated tuple.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Users => &[
                "Id",
                "Reputation",
                "CreationDate",
                "DisplayName",
                "LastAccessDate",
                "WebsiteUrl",
                "Location",
                "AboutMe",
                "Views",
                "UpVotes",
                "DownVotes",
                "ProfileImageUrl",
                "Age",
                "AccountId",
            ],
            Self::Badges => &["Id", "UserId", "Name", "Date"],
            Self::Posts => &[
                "Id",
                "PostTypeId",
                "AcceptedAnswerId",
                "ParentId",
                "CreationDate",
                "Score",
                "ViewCount",
                "Body",
                "OwnerUserId",
                "LastEditorUserId",
                "LastEditorDisplayName",
                "LastEditDate",
                "LastActivityDate",
                "Title",
                "Tags",
                "AnswerCount",
                "CommentCount",
                "FavoriteCount",
                "ClosedDate",
                "CommunityOwnedDate",
            ],
            Self::Tags => &["Id", "TagName", "Count", "ExcerptPostId", "WikiPostId"],
            Self::Votes => &[
                "Id",
                "PostId",
                "VoteTypeId",
                "UserId",
                "CreationDate",
                "BountyAmount",
            ],
            Self::PostLinks => &[
                "Id",
                "CreationDate",
                "PostId",
                "RelatedPostId",
                "LinkTypeId",
            ],
            Self::PostHistory => &[
                "Id",
                "PostHistoryTypeId",
                "PostId",
                "RevisionGUID",
                "CreationDate",
                "UserId",
                "Text",
            ],
            Self::Comments => &["Id", "PostId", "Score", "Text", "CreationDate", "UserId"],
        }
    }

    /// Dump file read when no explicit input path is given.
    pub fn default_input_file(&self) -> String {
        format!("{}.xml", self.name())
    }

    /// File name of the script run before loading (drop/create).
    pub fn pre_script_name(&self) -> String {
        format!("{}_pre.sql", self.name())
    }

    /// File name of the script run after loading (indexes).
    pub fn post_script_name(&self) -> String {
        format!("{}_post.sql", self.name())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Table::ALL
            .into_iter()
            .find(|table| table.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let available: Vec<&str> = Table::ALL.iter().map(Table::name).collect();
                AppError::InvalidInput(format!(
                    "Unknown table '{wanted}'. Available tables: {}",
                    available.join(", ")
                ))
            })
    }
}

/// One parsed data row: column name to raw attribute value, in source order.
///
/// A column that is not present is unset; the formatter renders it as `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Returns the raw value of `column`, if the row carried it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    // Later duplicates replace earlier ones so lookups stay unambiguous.
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut fields: Vec<(String, String)> = Vec::new();
        for (name, value) in iter {
            let (name, value) = (name.into(), value.into());
            match fields.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = value,
                None => fields.push((name, value)),
            }
        }
        Self { fields }
    }
}
