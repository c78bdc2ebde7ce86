//! Tag reading/writing backed by `lofty`.

use std::path::Path;

use image::ImageFormat;
use log::{debug, warn};

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};

use super::{FileRecord, TagPersistence};

/// Persists enriched records into the audio file's primary tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagStore;

fn first_non_empty_value<F>(primary_tag: Option<&Tag>, tags: &[Tag], mut extractor: F) -> String
where
    F: FnMut(&Tag) -> Option<String>,
{
    primary_tag
        .into_iter()
        .chain(tags.iter())
        .filter_map(|tag| extractor(tag))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn derive_year_from_date(date: &str) -> String {
    let year: String = date.chars().take(4).collect();
    if year.chars().count() == 4 && year.chars().all(|ch| ch.is_ascii_digit()) {
        year
    } else {
        String::new()
    }
}

fn parse_bpm(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    trimmed
        .parse::<u32>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|bpm| bpm.round().max(0.0) as u32))
}

/// Splits "03/12" into (3, Some(12)); a bare "7" yields (7, None).
fn parse_track_number(value: &str) -> Option<(u32, Option<u32>)> {
    let (number, total) = match value.split_once('/') {
        Some((number, total)) => (number, Some(total)),
        None => (value, None),
    };
    let number = number.trim().parse::<u32>().ok()?;
    let total = match total {
        Some(total) => Some(total.trim().parse::<u32>().ok()?),
        None => None,
    };
    Some((number, total))
}

/// Title carries a trailing "(<mix>)" label, the shape enriched titles take.
fn has_mix_label(title: &str) -> bool {
    let trimmed = title.trim_end();
    trimmed.ends_with(')')
        && trimmed
            .rfind(" (")
            .is_some_and(|open| open + 2 < trimmed.len() - 1)
}

/// Default lookup verdict for a freshly loaded record.
pub fn default_lookup_verdict(record: &FileRecord) -> bool {
    record.artist.trim().is_empty()
        || record.title.trim().is_empty()
        || record.album.trim().is_empty()
        || !has_mix_label(&record.title)
}

/// Reads a [`FileRecord`] from a media file's tags.
pub fn read_file_record(path: &Path) -> Result<FileRecord, String> {
    let tagged_file =
        read_from_path(path).map_err(|error| format!("Failed to read tags: {error}"))?;
    let primary_tag = tagged_file.primary_tag();
    let tags = tagged_file.tags();

    let mut record = FileRecord::new(path);
    record.artist = first_non_empty_value(primary_tag, tags, |tag| {
        tag.artist().map(|value| value.into_owned())
    });
    record.title = first_non_empty_value(primary_tag, tags, |tag| {
        tag.title().map(|value| value.into_owned())
    });
    record.album = first_non_empty_value(primary_tag, tags, |tag| {
        tag.album().map(|value| value.into_owned())
    });
    record.album_artist = first_non_empty_value(primary_tag, tags, |tag| {
        tag.get_string(ItemKey::AlbumArtist).map(str::to_string)
    });
    record.release_year = first_non_empty_value(primary_tag, tags, |tag| {
        tag.get_string(ItemKey::RecordingDate)
            .or_else(|| tag.get_string(ItemKey::Year))
            .map(str::to_string)
    });
    record.genre = first_non_empty_value(primary_tag, tags, |tag| {
        tag.genre().map(|value| value.into_owned())
    });
    record.comment = first_non_empty_value(primary_tag, tags, |tag| {
        tag.comment().map(|value| value.into_owned())
    });
    record.track_number = first_non_empty_value(primary_tag, tags, |tag| {
        tag.get_string(ItemKey::TrackNumber)
            .map(str::to_string)
            .or_else(|| tag.track().map(|value| value.to_string()))
    });
    record.bpm = parse_bpm(&first_non_empty_value(primary_tag, tags, |tag| {
        tag.get_string(ItemKey::IntegerBpm)
            .or_else(|| tag.get_string(ItemKey::Bpm))
            .map(str::to_string)
    }));
    record.embedded_image = primary_tag
        .into_iter()
        .chain(tags.iter())
        .find_map(|tag| tag.pictures().first())
        .map(|picture| picture.data().to_vec());

    let needs_lookup = default_lookup_verdict(&record);
    record.set_needs_metadata_lookup(needs_lookup);
    Ok(record)
}

/// Cover formats that can be embedded as a tag picture. Anything else is
/// rejected before it reaches a record.
pub fn artwork_mime_type(bytes: &[u8]) -> Result<MimeType, String> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => Ok(MimeType::Jpeg),
        Ok(ImageFormat::Png) => Ok(MimeType::Png),
        Ok(ImageFormat::Gif) => Ok(MimeType::Gif),
        Ok(ImageFormat::Bmp) => Ok(MimeType::Bmp),
        Ok(ImageFormat::Tiff) => Ok(MimeType::Tiff),
        Ok(other) => Err(format!("Unsupported album art format: {other:?}")),
        Err(error) => Err(format!("Unrecognized album art: {error}")),
    }
}

fn set_text(tag: &mut Tag, key: ItemKey, value: &str) {
    tag.remove_key(key);
    let trimmed = value.trim();
    if !trimmed.is_empty() {
        tag.insert_text(key, trimmed.to_string());
    }
}

fn cover_picture(bytes: &[u8], record: &FileRecord) -> Option<Picture> {
    match artwork_mime_type(bytes) {
        Ok(mime_type) => Some(
            Picture::unchecked(bytes.to_vec())
                .pic_type(PictureType::CoverFront)
                .mime_type(mime_type)
                .build(),
        ),
        Err(error) => {
            warn!(
                "LoftyTagStore: keeping existing cover for {}: {}",
                record.path().display(),
                error
            );
            None
        }
    }
}

/// Copies a record's enriched fields into `tag`. The front cover is replaced
/// only when `image` holds an embeddable picture.
fn apply_record_to_tag(tag: &mut Tag, record: &FileRecord, image: Option<&[u8]>) {
    let picture = image.and_then(|bytes| cover_picture(bytes, record));

    tag.set_artist(record.artist.clone());
    tag.set_title(record.title.clone());
    tag.set_album(record.album.clone());
    tag.set_genre(record.genre.clone());
    tag.set_comment(record.comment.clone());
    set_text(tag, ItemKey::AlbumArtist, &record.album_artist);
    set_text(tag, ItemKey::RecordingDate, &record.release_year);
    set_text(tag, ItemKey::Year, &derive_year_from_date(&record.release_year));

    match parse_track_number(&record.track_number) {
        Some((number, total)) => {
            tag.remove_key(ItemKey::TrackNumber);
            tag.set_track(number);
            match total {
                Some(total) => tag.set_track_total(total),
                None => tag.remove_track_total(),
            }
        }
        None => set_text(tag, ItemKey::TrackNumber, &record.track_number),
    }

    tag.remove_key(ItemKey::Bpm);
    tag.remove_key(ItemKey::IntegerBpm);
    if let Some(bpm) = record.bpm {
        tag.insert_text(ItemKey::IntegerBpm, bpm.to_string());
    }

    if let Some(picture) = picture {
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(picture);
    }
}

impl TagPersistence for LoftyTagStore {
    fn persist_tags_with_image(
        &self,
        record: &FileRecord,
        image: Option<&[u8]>,
    ) -> Result<(), String> {
        let path = record.path();
        let mut tagged_file =
            read_from_path(path).map_err(|error| format!("Failed to read tags: {error}"))?;
        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }

        let tag = tagged_file
            .tag_mut(tag_type)
            .ok_or_else(|| format!("No writable tag available for {:?}", tag_type))?;
        apply_record_to_tag(tag, record, image);

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|error| format!("Failed to write tags: {error}"))?;
        debug!("LoftyTagStore: saved tags for {}", path.display());
        Ok(())
    }
}
