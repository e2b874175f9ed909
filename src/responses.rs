//! Canned assistant replies.
//!
//! Nothing here looks at the picture. Image turns get one of the analysis
//! templates at random; text turns are matched against keyword groups in
//! priority order.

use rand::Rng;

pub const IMAGE_ANALYSIS_TEMPLATES: [&str; 3] = [
    "I can see your plant image! 🔍\n\nBased on the visual signs, here's what I notice:\n\n🐛 **Possible Issue**: This could be an aphid infestation or early signs of leaf spot disease.\n\n**Recommended Actions:**\n1. Check undersides of leaves for small insects\n2. Remove affected leaves if less than 30% are damaged\n3. Apply neem oil spray (2-3 tbsp per liter of water)\n4. Ensure good air circulation around plants\n\nWould you like more specific treatment options?",
    "Thanks for sharing the image! 📸\n\n**Analysis Results:**\n\n🌿 The yellowing pattern suggests possible nutrient deficiency, likely nitrogen or iron.\n\n**Quick Solutions:**\n1. Test your soil pH (should be 6.0-7.0 for most crops)\n2. Apply balanced NPK fertilizer\n3. Add compost to improve soil health\n4. Water deeply but less frequently\n\nDo you want me to recommend specific fertilizers?",
    "I've analyzed your plant photo! 🌾\n\n**Detection**: Signs of fungal infection (possibly powdery mildew)\n\n**Treatment Plan:**\n1. Remove and destroy infected leaves\n2. Apply sulfur-based fungicide\n3. Avoid overhead watering\n4. Space plants for better airflow\n5. Apply in early morning or evening\n\nShall I explain any of these steps in detail?",
];

pub const PEST_CONTROL_TEMPLATE: &str = "For pest control, here are some effective organic solutions:\n\n🌿 **Neem Oil Spray**: Mix 2 tbsp neem oil + 1 tbsp dish soap in 1 liter water\n\n🧄 **Garlic Spray**: Blend 2 garlic bulbs, steep overnight, strain and spray\n\n🌶️ **Chili Spray**: Mix chili powder with water and a drop of soap\n\nWould you like to share a photo so I can identify the specific pest?";

pub const YELLOW_LEAVES_TEMPLATE: &str = "Yellow leaves can indicate several issues:\n\n💧 **Overwatering**: Let soil dry between watering\n🌱 **Nitrogen Deficiency**: Add nitrogen-rich fertilizer\n☀️ **Sunlight Issues**: Ensure adequate sunlight (6-8 hours)\n🐛 **Pest Damage**: Check for insects\n\nCan you describe which leaves are yellowing (old or new)? Or share a photo?";

pub const DISEASE_TREATMENT_TEMPLATE: &str = "For plant diseases, prevention is key!\n\n**Common Treatments:**\n1. 🧪 Copper-based fungicide for bacterial issues\n2. 🍃 Baking soda spray (1 tbsp per gallon) for mild fungus\n3. ✂️ Prune affected areas and sterilize tools\n4. 💨 Improve air circulation\n\nPlease share a photo for accurate disease identification!";

pub const MORE_DETAIL_TEMPLATE: &str = "I'd be happy to help with your crop concern! 🌻\n\nFor the most accurate diagnosis, please:\n\n📸 **Share a photo** of the affected plant\n📝 **Describe symptoms** (color changes, spots, wilting, etc.)\n🌍 **Mention your location** and crop type\n\nThe more details you provide, the better I can assist you!";

const PEST_TERMS: &[&str] = &["pest", "insect", "bug"];
const YELLOW_LEAF_TERMS: &[&str] = &["yellow", "leaf"];
const DISEASE_TERMS: &[&str] = &["disease", "fungus", "rot"];

/// Which template family a text-only turn falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    PestControl,
    YellowLeaves,
    DiseaseTreatment,
    MoreDetail,
}

impl ResponseKind {
    pub fn template(self) -> &'static str {
        match self {
            ResponseKind::PestControl => PEST_CONTROL_TEMPLATE,
            ResponseKind::YellowLeaves => YELLOW_LEAVES_TEMPLATE,
            ResponseKind::DiseaseTreatment => DISEASE_TREATMENT_TEMPLATE,
            ResponseKind::MoreDetail => MORE_DETAIL_TEMPLATE,
        }
    }
}

/// Plain substring matching, so "rot" also hits "carrot".
pub fn classify(user_text: &str) -> ResponseKind {
    let text = user_text.to_lowercase();
    let mentions = |terms: &[&str]| terms.iter().any(|term| text.contains(term));

    if mentions(PEST_TERMS) {
        ResponseKind::PestControl
    } else if mentions(YELLOW_LEAF_TERMS) {
        ResponseKind::YellowLeaves
    } else if mentions(DISEASE_TERMS) {
        ResponseKind::DiseaseTreatment
    } else {
        ResponseKind::MoreDetail
    }
}

pub fn select_response<R: Rng + ?Sized>(
    user_text: &str,
    has_image: bool,
    rng: &mut R,
) -> &'static str {
    if has_image {
        let index = rng.gen_range(0..IMAGE_ANALYSIS_TEMPLATES.len());
        return IMAGE_ANALYSIS_TEMPLATES[index];
    }
    classify(user_text).template()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::rngs::mock::StepRng;

    fn text_reply(text: &str) -> &'static str {
        select_response(text, false, &mut StepRng::new(0, 0))
    }

    #[test]
    fn test_pest_terms_win_over_other_groups() {
        assert_eq!(classify("bugs on a yellow leaf with rot"), ResponseKind::PestControl);
        assert_eq!(classify("Tiny INSECTS everywhere"), ResponseKind::PestControl);
        assert_eq!(text_reply("pest and disease"), PEST_CONTROL_TEMPLATE);
    }

    #[test]
    fn test_yellow_leaf_beats_disease() {
        assert_eq!(classify("Yellow spots, maybe fungus?"), ResponseKind::YellowLeaves);
        assert_eq!(classify("one leaf is curling"), ResponseKind::YellowLeaves);
    }

    #[test]
    fn test_plural_leaves_does_not_contain_leaf() {
        assert_eq!(classify("the leaves are curling"), ResponseKind::MoreDetail);
    }

    #[test]
    fn test_disease_terms() {
        assert_eq!(text_reply("Is this a DISEASE?"), DISEASE_TREATMENT_TEMPLATE);
        assert_eq!(classify("white fungus on stems"), ResponseKind::DiseaseTreatment);
        assert_eq!(classify("root rot"), ResponseKind::DiseaseTreatment);
    }

    #[test]
    fn test_substring_matching_is_literal() {
        // "carrot" contains "rot"
        assert_eq!(classify("my carrot crop"), ResponseKind::DiseaseTreatment);
        // "debug" contains "bug"
        assert_eq!(classify("debug"), ResponseKind::PestControl);
    }

    #[test]
    fn test_empty_and_unmatched_text_ask_for_detail() {
        assert_eq!(text_reply(""), MORE_DETAIL_TEMPLATE);
        assert_eq!(text_reply("   "), MORE_DETAIL_TEMPLATE);
        assert_eq!(text_reply("hi"), MORE_DETAIL_TEMPLATE);
    }

    #[test]
    fn test_image_turns_ignore_keywords() {
        let reply = select_response("pest", true, &mut StepRng::new(0, 0));
        assert_eq!(reply, IMAGE_ANALYSIS_TEMPLATES[0]);
    }

    #[test]
    fn test_image_replies_stay_within_template_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; IMAGE_ANALYSIS_TEMPLATES.len()];
        for text in ["", "yellow leaf", "anything at all"].iter().cycle().take(300) {
            let reply = select_response(text, true, &mut rng);
            let index = IMAGE_ANALYSIS_TEMPLATES
                .iter()
                .position(|template| *template == reply)
                .expect("reply outside the image template set");
            seen[index] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }
}
