//! Prompt templates for the language-model stages.

/// Build the prompt that turns a changelog section into a narration script.
pub fn build_summary_prompt(changelog_section: &str) -> String {
    format!(
        r#"You are a product marketing writer. Turn the release notes below into a
voice-over script for an 8 second product update video.

Rules:
- At most 2 short sentences, under 30 words in total
- Mention the single most exciting change first
- Plain spoken English, no markdown, no emojis, no version numbers read digit by digit
- Return ONLY the script text

RELEASE NOTES:
{}"#,
        changelog_section.trim()
    )
}

/// Build the prompt that turns a narration script into an image prompt.
pub fn build_visual_prompt(script: &str) -> String {
    format!(
        r#"Write a single prompt for an image generation model. The image is the
opening frame of a short product update video narrated by the script below.

Rules:
- Describe one clean, modern scene with a clear focal subject
- Specify lighting, color palette and camera framing
- No text, logos, UI screenshots or real people
- Under 80 words, return ONLY the prompt

SCRIPT:
{}"#,
        script.trim()
    )
}

/// Build the Veo prompt for animating the opening frame.
pub fn build_video_prompt(script: &str) -> String {
    format!(
        "Animate this frame into a smooth cinematic product teaser with gentle \
         camera motion. A friendly narrator says: \"{}\"",
        script.trim().replace('"', "'")
    )
}

/// Strip a surrounding markdown code fence the model sometimes adds.
pub fn clean_model_text(text: &str) -> String {
    let text = text.trim();
    let text = text
        .strip_prefix("```text")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim().trim_matches('"').trim().to_string()
}
