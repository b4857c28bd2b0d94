use log::info;

use crate::error::AppError;
use crate::media::DataUri;
use crate::provider::{GenerativeClient, Modality, Part};

const IMAGE_MODALITIES: &[Modality] = &[Modality::Text, Modality::Image];

const DEFAULT_ENHANCE_PROMPT: &str = "Enhance this image to look like a professional \
graphic design. Improve lighting, color, composition, and overall appeal.";

const IDENTITY_LOCK_PREAMBLE: &str = "You are a highly specialized image generation AI \
functioning as a fine-tuned character model. Treat the reference images that follow as an \
identity lock: replicate the person's facial features, skin tone and texture, and body \
shape with absolute precision. Produce a realistic photo matching the realism of the \
references. Do not stylize, caricature or otherwise alter the character; every other \
aspect of the request is secondary to preserving the identity.";

/// Exactly one provider call; the result must be a single encoded image.
pub(crate) async fn from_description(
    provider: &dyn GenerativeClient,
    description: &str,
) -> Result<DataUri, AppError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(AppError::InvalidInput("A description is required.".into()));
    }
    info!("Generating image from description ({} chars)", description.len());

    let parts = [Part::text(format!(
        "Generate an image based on the following description: {}.",
        description
    ))];
    require_image(provider.generate(&parts, IMAGE_MODALITIES).await?)
}

pub(crate) async fn enhance(
    provider: &dyn GenerativeClient,
    image: &DataUri,
    prompt: Option<&str>,
) -> Result<DataUri, AppError> {
    let instruction = match prompt.map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => DEFAULT_ENHANCE_PROMPT,
    };
    info!("Enhancing image ({})", image.mime);

    let parts = [Part::media(image), Part::text(instruction)];
    require_image(provider.generate(&parts, IMAGE_MODALITIES).await?)
}

/// Reference images establish the identity, then the scene prompt follows.
/// All references go to the provider in one call; none may be dropped.
pub(crate) async fn with_character(
    provider: &dyn GenerativeClient,
    prompt: &str,
    references: &[DataUri],
) -> Result<DataUri, AppError> {
    if references.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one reference image is required.".into(),
        ));
    }
    info!(
        "Generating image with character ({} reference images)",
        references.len()
    );

    let mut parts = Vec::with_capacity(references.len() + 2);
    parts.push(Part::text(IDENTITY_LOCK_PREAMBLE));
    for image in references {
        parts.push(Part::media(image));
    }
    parts.push(Part::text(format!(
        "IDENTITY ESTABLISHED. Now generate a high-quality, photorealistic image based on \
the following scene description: \"{}\". The character's appearance must be an exact, \
unaltered match to the reference images.",
        prompt
    )));

    require_image(provider.generate(&parts, IMAGE_MODALITIES).await?)
}

pub(crate) async fn transfer_style(
    provider: &dyn GenerativeClient,
    prompt: &str,
    style: &DataUri,
    strength: f32,
) -> Result<DataUri, AppError> {
    if !(0.0..=1.0).contains(&strength) {
        return Err(AppError::InvalidInput(
            "Style strength must be between 0 and 1.".into(),
        ));
    }
    info!("Transferring style (strength {})", strength);

    let parts = [
        Part::media(style),
        Part::text(format!(
            "generate an image of {} with style strength {}",
            prompt, strength
        )),
    ];
    require_image(provider.generate(&parts, IMAGE_MODALITIES).await?)
}

/// Refine a user prompt with missing details and better terminology.
pub(crate) async fn improve_prompt(
    provider: &dyn GenerativeClient,
    original: &str,
) -> Result<String, AppError> {
    let original = original.trim();
    if original.is_empty() {
        return Err(AppError::InvalidInput("A prompt is required.".into()));
    }
    info!("Improving image generation prompt");

    let parts = [Part::text(format!(
        "You are an expert prompt engineer specializing in improving image generation \
prompts. Given an initial image generation prompt, refine it by incorporating missing \
details, better terminology, and popular concepts to achieve better results. Reply with \
the improved prompt only.\n\nOriginal Prompt: {}\n\nImproved Prompt:",
        original
    ))];

    let generated = provider.generate(&parts, &[Modality::Text]).await?;
    generated
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Provider("no improved prompt was returned".into()))
}

fn require_image(generated: crate::provider::Generated) -> Result<DataUri, AppError> {
    generated
        .media
        .ok_or_else(|| AppError::Provider("no image was generated".into()))
}
