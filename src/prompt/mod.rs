use crate::{
    error::{AppError, AppResult},
    models::{AnimationStyle, GenerationStyle},
};

const RESTYLE_SUFFIX: &str =
    "High quality, detailed texture. Maintain the original composition and subject.";

fn style_instruction(style: GenerationStyle) -> Option<&'static str> {
    let instruction = match style {
        GenerationStyle::Original => return None,
        GenerationStyle::Wool => {
            "Transform this image into a 3D needle felted wool art style.\nThe subject should look like a cute, handmade doll or sculpture made of wool.\nVisible knitted or felted textures. Soft, fuzzy edges. Warm, cozy lighting.\nMaintain the composition but make it look like a miniature wool world."
        }
        GenerationStyle::Watercolor => {
            "Transform this image into a beautiful watercolor painting.\nSoft washes of color, paper texture visible, artistic brush strokes.\nDreamy, ethereal atmosphere. Keep the main subject clear but stylized."
        }
        GenerationStyle::Clay => {
            "Transform this image into a cute 3D plasticine claymation style.\nSmooth textures, rounded edges, looks like a stop-motion set.\nVibrant colors, toy-like appearance."
        }
        GenerationStyle::Pixel => {
            "Transform this image into detailed 16-bit pixel art.\nVibrant colors, clear pixel grid, retro video game aesthetic.\nMaintain readability of the subject."
        }
        GenerationStyle::Sketch => {
            "Transform this image into a hand-drawn pencil sketch.\nGraphite textures, shading lines, artistic rough edges.\nMonochrome or slightly sepia toned, on paper background."
        }
    };

    Some(instruction)
}

fn motion_qualifier(style: AnimationStyle) -> &'static str {
    match style {
        AnimationStyle::Wool => {
            "Keep the 3D needle felted wool style. The motion should feel stop-motion or soft."
        }
        AnimationStyle::Cartoon => "Transform slightly into a vibrant 3D cartoon animation.",
        AnimationStyle::Watercolor => "Animate with a flowing watercolor effect.",
        AnimationStyle::ThreeD => "High fidelity 3D rendering animation.",
    }
}

/// Instruction sent alongside the photo, or `None` for the passthrough style.
pub fn build_restyle_prompt(style: GenerationStyle) -> Option<String> {
    style_instruction(style).map(|instruction| format!("{instruction}\n{RESTYLE_SUFFIX}"))
}

pub fn build_animation_prompt(motion_prompt: &str, style: AnimationStyle) -> AppResult<String> {
    let trimmed = motion_prompt.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("motion prompt is required"));
    }

    let qualifier = motion_qualifier(style).trim_end_matches('.');
    Ok(format!(
        "Animate this character: {trimmed}. {qualifier}. High quality, cinematic."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_style_has_no_prompt() {
        assert!(build_restyle_prompt(GenerationStyle::Original).is_none());
    }

    #[test]
    fn each_remote_style_has_a_distinct_instruction() {
        let prompts: Vec<String> = GenerationStyle::ALL
            .into_iter()
            .filter_map(build_restyle_prompt)
            .collect();
        assert_eq!(prompts.len(), 5);
        for (index, prompt) in prompts.iter().enumerate() {
            assert!(prompt.ends_with(RESTYLE_SUFFIX));
            assert!(prompts[index + 1..].iter().all(|other| other != prompt));
        }
    }

    #[test]
    fn animation_prompt_combines_motion_and_qualifier() {
        let prompt = build_animation_prompt("  waving happily ", AnimationStyle::Watercolor).unwrap();
        assert_eq!(
            prompt,
            "Animate this character: waving happily. Animate with a flowing watercolor effect. High quality, cinematic."
        );
    }

    #[test]
    fn blank_motion_prompt_is_rejected() {
        assert!(build_animation_prompt("   ", AnimationStyle::Wool).is_err());
    }
}
