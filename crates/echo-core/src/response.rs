use serde::{Deserialize, Serialize};

/// What the bot sends back for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    /// Plain message text.
    Text { text: String },
    /// A structured card (title + fields).
    Embed { embed: Embed },
}

impl Response {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn embed(embed: Embed) -> Self {
        Self::Embed { embed }
    }

    /// Render for channels that only understand plain text.
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Embed { embed } => embed.to_plain_text(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Embed { .. } => None,
        }
    }

    pub fn as_embed(&self) -> Option<&Embed> {
        match self {
            Self::Embed { embed } => Some(embed),
            Self::Text { .. } => None,
        }
    }
}

/// Accent colours used by the bot's cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedColor {
    Blue,
    Green,
    Purple,
}

impl EmbedColor {
    /// RGB value as Discord expects it.
    pub fn rgb(self) -> u32 {
        match self {
            Self::Blue => 0x3498db,
            Self::Green => 0x2ecc71,
            Self::Purple => 0x9b59b6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub color: EmbedColor,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>, color: EmbedColor) -> Self {
        Self {
            title: title.into(),
            description: None,
            color,
            fields: Vec::new(),
            footer: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a full-width field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn to_plain_text(&self) -> String {
        let mut out = format!("== {} ==", self.title);
        if let Some(ref d) = self.description {
            out.push('\n');
            out.push_str(d);
        }
        for f in &self.fields {
            out.push_str(&format!("\n\n{}\n{}", f.name, f.value));
        }
        if let Some(ref footer) = self.footer {
            out.push_str(&format!("\n\n-- {footer}"));
        }
        out
    }
}
