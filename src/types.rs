#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Asset categories backed up per account, in the order they are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Category {
    #[value(name = "my-photos")]
    MyPhotos,
    #[value(name = "photos-of-me")]
    PhotosOfMe,
    #[value(name = "my-videos")]
    MyVideos,
    #[value(name = "videos-of-me")]
    VideosOfMe,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::MyPhotos,
        Category::PhotosOfMe,
        Category::MyVideos,
        Category::VideosOfMe,
    ];

    /// Subfolder of the backup root this category is written to.
    pub fn folder(&self) -> &'static str {
        match self {
            Category::MyPhotos => "my_photos",
            Category::PhotosOfMe => "photos_of_me",
            Category::MyVideos => "my_videos",
            Category::VideosOfMe => "videos_of_me",
        }
    }

    /// Wording for the "nothing to download" message.
    pub fn describe(&self) -> &'static str {
        match self {
            Category::MyPhotos => "uploaded photo",
            Category::PhotosOfMe => "photo of you",
            Category::MyVideos => "uploaded video",
            Category::VideosOfMe => "video of you",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.folder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_folders_are_distinct() {
        let mut folders: Vec<&str> = Category::ALL.iter().map(|c| c.folder()).collect();
        folders.sort();
        folders.dedup();
        assert_eq!(folders.len(), Category::ALL.len());
    }

    #[test]
    fn test_category_order_matches_all() {
        let mut sorted = Category::ALL;
        sorted.sort();
        assert_eq!(sorted, Category::ALL);
    }
}
