//! The imgen endpoints, one row per command.

/// Something the user passes to a command, in the order it is typed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arg {
    /// Optional image: attachment, URL, custom emoji or member avatar.
    /// Defaults to the author's avatar.
    Image,
    /// Optional member. Defaults to the author.
    Member,
    /// A required member, then an optional second one defaulting to the
    /// author. The second member is drawn first.
    Pair,
    /// One required word.
    Word,
    /// Required free text, the rest of the line.
    Text,
    /// Required single (quotable) token.
    TopText,
    BottomText,
    /// Optional single tokens.
    Color,
    Font,
}

impl Arg {
    pub fn usage(self) -> &'static str {
        match self {
            Arg::Image => "[image]",
            Arg::Member => "[member]",
            Arg::Pair => "<member> [member]",
            Arg::Word => "<word>",
            Arg::Text => "<text>",
            Arg::TopText => "<top_text>",
            Arg::BottomText => "<bottom_text>",
            Arg::Color => "[color]",
            Arg::Font => "[font]",
        }
    }
}

/// A query parameter sent to imgen, in the order it appears in the URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Param {
    /// `avatar1`: the image, or the member's avatar.
    Avatar1,
    /// `avatar2`: the second avatar of a pair.
    Avatar2,
    /// `username1`: the member's account name.
    Username1,
    /// `username1`: the member's display name.
    DisplayName1,
    /// `username2`: the member's account name.
    Username2,
    Text,
    TopText,
    BottomText,
    Color,
    Font,
}

impl Param {
    pub fn key(self) -> &'static str {
        match self {
            Param::Avatar1 => "avatar1",
            Param::Avatar2 => "avatar2",
            Param::Username1 | Param::DisplayName1 => "username1",
            Param::Username2 => "username2",
            Param::Text => "text",
            Param::TopText => "top_text",
            Param::BottomText => "bottom_text",
            Param::Color => "color",
            Param::Font => "font",
        }
    }
    /// Image URLs keep their `:/?=` readable; everything else is user text.
    pub fn is_url(self) -> bool {
        match self {
            Param::Avatar1 | Param::Avatar2 => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// Binary asset uploaded under this file name.
    File(&'static str),
    /// JSON `{"text": ...}` relayed as a message.
    Json,
}

#[derive(Debug)]
pub struct Endpoint {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub route: &'static str,
    pub args: &'static [Arg],
    pub params: &'static [Param],
    pub output: Output,
    pub help: &'static str,
}

impl Endpoint {
    pub fn usage(&self) -> String {
        let mut usage = self.name.to_owned();
        for arg in self.args {
            usage.push(' ');
            usage.push_str(arg.usage());
        }
        usage
    }
}

const fn text(
    name: &'static str,
    route: &'static str,
    file: &'static str,
    help: &'static str,
) -> Endpoint {
    Endpoint {
        name,
        aliases: &[],
        route,
        args: &[Arg::Text],
        params: &[Param::Text],
        output: Output::File(file),
        help,
    }
}

const fn image(
    name: &'static str,
    route: &'static str,
    file: &'static str,
    help: &'static str,
) -> Endpoint {
    Endpoint {
        name,
        aliases: &[],
        route,
        args: &[Arg::Image],
        params: &[Param::Avatar1],
        output: Output::File(file),
        help,
    }
}

/// Optional member, then text. Sends the avatar, account name and text.
const fn member_named(
    name: &'static str,
    route: &'static str,
    file: &'static str,
    help: &'static str,
) -> Endpoint {
    Endpoint {
        name,
        aliases: &[],
        route,
        args: &[Arg::Member, Arg::Text],
        params: &[Param::Avatar1, Param::Username1, Param::Text],
        output: Output::File(file),
        help,
    }
}

/// Optional member, then text. Sends the avatar and text.
const fn member_text(
    name: &'static str,
    route: &'static str,
    file: &'static str,
    help: &'static str,
) -> Endpoint {
    Endpoint {
        name,
        aliases: &[],
        route,
        args: &[Arg::Member, Arg::Text],
        params: &[Param::Avatar1, Param::Text],
        output: Output::File(file),
        help,
    }
}

const fn pair(
    name: &'static str,
    route: &'static str,
    file: &'static str,
    help: &'static str,
) -> Endpoint {
    Endpoint {
        name,
        aliases: &[],
        route,
        args: &[Arg::Pair],
        params: &[Param::Avatar1, Param::Avatar2],
        output: Output::File(file),
        help,
    }
}

pub static ENDPOINTS: &[Endpoint] = &[
    text("abandon", "/abandon", "abandon.png", "Abandoning your son?"),
    Endpoint {
        aliases: &["aborted"],
        ..image("abort", "/aborted", "abort.png", "All the reasons why X was aborted.")
    },
    image("affect", "/affect", "affect.png", "It won't affect my baby."),
    image("airpods", "/airpods", "airpods.png", "Flex with airpods."),
    image("america", "/america", "america.png", "Americafy a picture."),
    text("armor", "/armor", "armor.png", "Nothing gets through this armour."),
    text(
        "balloon",
        "/balloon",
        "balloon.png",
        "Pop a balloon. Texts must be comma separated.",
    ),
    pair("bed", "/bed", "bed.png", "There's a monster under my bed."),
    image("bongocat", "/bongocat", "bongocat.png", "Bongocat-ify your image."),
    text("boo", "/boo", "boo.png", "Scary. Texts must be comma separated."),
    text(
        "brain",
        "/brain",
        "brain.png",
        "Big brain meme. Texts must be 4 comma separated items.",
    ),
    image("brazzers", "/brazzers", "brazzers.png", "Brazzerfy your image."),
    member_named(
        "byemom",
        "/byemom",
        "byemom.png",
        "Bye mom. User is a discord user ID, name or mention.",
    ),
    image("cancer", "/cancer", "cancer.png", "Squidward sign."),
    text("changemymind", "/changemymind", "changemymind.png", "Change my mind?"),
    text(
        "cheating",
        "/cheating",
        "cheating.png",
        "Cheating? Text must be comma separated.",
    ),
    text(
        "crab",
        "/crab",
        "crabrave.mp4",
        "Crab rave. Text must be comma separated.",
    ),
    text(
        "paperplease",
        "/citation",
        "citation.png",
        "Papers Please Citation. Text must be 3 comma separated values.",
    ),
    image("communism", "/communism", "communism.png", "Communism-ify your picture."),
    text(
        "confusedcat",
        "/confusedcat",
        "confusedcat.png",
        "Confused cat meme. Text must be 2 comma separated values.",
    ),
    image("corporate", "/corporate", "corporate.png", "Corporate meme."),
    text(
        "cry",
        "/cry",
        "cry.png",
        "Drink my tears meme. Text must be 2 comma separated values.",
    ),
    image("dab", "/dab", "dab.png", "Hit a dab."),
    image("dank", "/dank", "dank.png", "Dank, noscope 420."),
    image("deepfried", "/deepfry", "deepfry.png", "Deepfry an image."),
    image("delete", "/delete", "delete.png", "Delete Meme."),
    image("disability", "/disability", "disability.png", "Disability Meme."),
    text(
        "doglemon",
        "/doglemon",
        "doglemon.png",
        "Dog and Lemon Meme. Text must be 2 comma separated values.",
    ),
    image("door", "/door", "door.png", "Kick down the door meme."),
    image("egg", "/egg", "egg.png", "Turn your picture into an egg."),
    text(
        "excuseme",
        "/excuseme",
        "excuseme.png",
        "Excuse me, what the... Text must be 2 comma separated values.",
    ),
    text(
        "expanddong",
        "/expanddong",
        "expanddong.png",
        "Expanding? Text must be 2 comma separated values.",
    ),
    text(
        "facts",
        "/facts",
        "facts.png",
        "Facts book. Text must be 2 comma separated values.",
    ),
    image("failure", "/failure", "failure.png", "You're a failure meme."),
    image("fakenews", "/fakenews", "fakenews.png", "Fake News."),
    image("fedora", "/fedora", "fedora.png", "*Tips Fedora*."),
    member_text(
        "floor",
        "/floor",
        "floor.png",
        "The floor is .... User is a discord user ID, name or mention.",
    ),
    text(
        "fuck",
        "/fuck",
        "fuck.png",
        "Feck. Text must be 2 comma separated values.",
    ),
    member_text(
        "garfield",
        "/garfield",
        "garfield.png",
        "I wonder who that's for - Garfield meme. User is a discord user ID, name or mention.",
    ),
    Endpoint {
        aliases: &["rainbow", "lgbtq"],
        ..image("lgbt", "/gay", "gay.png", "Rainbow-fy your picture.")
    },
    image("goggles", "/goggles", "goggles.png", "Remember, safety goggles on."),
    image("hitler", "/hitler", "hitler.png", "Worse than hitler?"),
    text("humansgood", "/humansgood", "humansgood.png", "Humans are wonderful things."),
    text("inator", "/inator", "inator.png", "Xinator."),
    Endpoint {
        aliases: &["invertcolor", "invertcolors", "invercolours"],
        ..image("invertcolour", "/invert", "invert.png", "Invert the colour of an image.")
    },
    image("ipad", "/ipad", "ipad.png", "Put your picture on an ipad."),
    image("jail", "/jail", "jail.png", "Send yourself to jail."),
    text(
        "justpretending",
        "/justpretending",
        "justpretending.png",
        "Playing dead. Text must be 2 comma separated values.",
    ),
    image("kimborder", "/kimborder", "kimborder.png", "Place yourself under mighty kim."),
    text(
        "knowyourlocation",
        "/knowyourlocation",
        "knowyourlocation.png",
        "Google wants to know your location. Text must be 2 comma separated values.",
    ),
    text(
        "kowalski",
        "/kowalski",
        "kowalski.gif",
        "Kowalski tapping. Text must be 2 comma separated values.",
    ),
    image("laid", "/laid", "laid.png", "Do you get laid?"),
    text("letmein", "/letmein", "letmein.mp4", "LET ME IN."),
    text(
        "lick",
        "/lick",
        "lick.png",
        "Lick lick. Text must be 2 comma separated values.",
    ),
    pair("madethis", "/madethis", "madethis.png", "I made this!"),
    image("magickify", "/magik", "magik.png", "Perform magik."),
    text(
        "master",
        "/master",
        "master.png",
        "Yes master! Text must be 3 comma separated values.",
    ),
    Endpoint {
        name: "meme",
        aliases: &[],
        route: "/meme",
        args: &[Arg::Image, Arg::TopText, Arg::BottomText, Arg::Color, Arg::Font],
        params: &[
            Param::Avatar1,
            Param::TopText,
            Param::BottomText,
            Param::Color,
            Param::Font,
        ],
        output: Output::File("meme.png"),
        help: "Make your own meme. Enclose texts longer than one word in \"\". \
               Fonts: arial, arimobold, impact, robotomedium, robotoregular, sans, \
               segoeuireg, tahoma and verdana. Colors are HEX codes or web colors. \
               The default is Impact in white.",
    },
    text("note", "/note", "note.png", "Pass a note back."),
    text("nothing", "/nothing", "nothing.png", "Woah! nothing."),
    text("ohno", "/ohno", "ohno.png", "Oh no, it's stupid!"),
    text("piccolo", "/piccolo", "piccolo.png", "Piccolo."),
    text(
        "plan",
        "/plan",
        "plan.png",
        "Gru makes a plan. Text must be 3 comma separated values.",
    ),
    text(
        "presentation",
        "/presentation",
        "presentation.png",
        "Lisa makes a presentation.",
    ),
    member_named("quote", "/quote", "quote.png", "Quote a discord user."),
    image("radialblur", "/radialblur", "radialblur.png", "Radialblur-ify your picture."),
    Endpoint {
        aliases: &["restinpeace"],
        ..image("tombstone", "/rip", "rip.png", "Give a lucky person a tombstone.")
    },
    image("roblox", "/roblox", "roblox.png", "Turn yourself into a roblox character."),
    image("salty", "/salty", "salty.png", "Add some salt."),
    image("satan", "/satan", "satan.png", "Place your picture over Satan."),
    text(
        "savehumanity",
        "/savehumanity",
        "savehumanity.png",
        "The secret to saving humanity.",
    ),
    pair(
        "screams",
        "/screams",
        "screams.png",
        "Why can't you just be normal? **Screams**",
    ),
    text("shit", "/shit", "shit.png", "I stepped in crap."),
    image("sickban", "/sickban", "sickban.png", "Ban this sick filth!"),
    pair("slap", "/slap", "slap.png", "*SLAPS*"),
    text(
        "slapsroof",
        "/slapsroof",
        "slapsroof.png",
        "This bad boy can fit so much in it.",
    ),
    text(
        "sneakyfox",
        "/sneakyfox",
        "sneakyfox.png",
        "That sneaky fox. Text must be 2 comma separated values.",
    ),
    pair("spank", "/spank", "spank.png", "*spanks*"),
    text("stroke", "/stroke", "stroke.png", "How to recognize a stroke?"),
    text(
        "surprised",
        "/surprised",
        "surprised.png",
        "Pikasurprised. Text must be 2 comma separated values.",
    ),
    member_named(
        "sword",
        "/sword",
        "sword.png",
        "Swordknife. Text must be split on commas.",
    ),
    text(
        "thesearch",
        "/thesearch",
        "thesearch.png",
        "The search for intelligent life continues..",
    ),
    image("trash", "/trash", "trash.png", "Peter Parker trash."),
    image("trigger", "/trigger", "trigger.gif", "Triggerfied."),
    Endpoint {
        name: "tweet",
        aliases: &[],
        route: "/tweet",
        args: &[Arg::Member, Arg::Text],
        params: &[
            Param::Avatar1,
            Param::DisplayName1,
            Param::Username2,
            Param::Text,
        ],
        output: Output::File("tweet.png"),
        help: "Create a fake tweet. Takes the member's avatar, display name and name.",
    },
    image("ugly", "/ugly", "ugly.png", "Make a user ugly."),
    member_named(
        "unpopular",
        "/unpopular",
        "unpopular.png",
        "Get rid of that pesky teacher.",
    ),
    text("violence", "/violence", "violence.png", "Violence is never the answer."),
    text(
        "violentsparks",
        "/violentsparks",
        "violentsparks.png",
        "Some violent sparks. Text must be 2 comma separated values.",
    ),
    text("vr", "/vr", "vr.png", "Woah, VR is so realistic."),
    text("walking", "/walking", "walking.png", "Walking Meme."),
    image("wanted", "/wanted", "wanted.png", "Heard you're a wanted fugitive?"),
    image("warp", "/warp", "warp.png", "Warp?"),
    image("whodidthis", "/whodidthis", "whodidthis.png", "Who did this?"),
    Endpoint {
        name: "whothisis",
        aliases: &[],
        route: "/whothisis",
        args: &[Arg::Member, Arg::Word],
        params: &[Param::Avatar1, Param::Text],
        output: Output::File("whothisis.png"),
        help: "Who this is.",
    },
    Endpoint {
        name: "yomomma",
        aliases: &[],
        route: "/yomomma",
        args: &[],
        params: &[],
        output: Output::Json,
        help: "Yo momma!",
    },
    member_named("youtube", "/youtube", "youtube.png", "Create a youtube comment."),
];

/// Look up an endpoint by its canonical command name.
pub fn find(name: &str) -> Option<&'static Endpoint> {
    ENDPOINTS.iter().find(|ep| ep.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_and_aliases_are_unique() {
        let mut seen = HashSet::new();
        for ep in ENDPOINTS {
            assert!(seen.insert(ep.name), "duplicate {}", ep.name);
            for alias in ep.aliases {
                assert!(seen.insert(*alias), "duplicate {}", alias);
            }
        }
    }

    #[test]
    fn every_argument_feeds_a_parameter() {
        for ep in ENDPOINTS {
            assert!(ep.route.starts_with('/'), "{}", ep.name);
            let has = |p: Param| ep.params.contains(&p);
            for arg in ep.args {
                let fed = match arg {
                    Arg::Image | Arg::Member => has(Param::Avatar1),
                    Arg::Pair => has(Param::Avatar1) && has(Param::Avatar2),
                    Arg::Word | Arg::Text => has(Param::Text),
                    Arg::TopText => has(Param::TopText),
                    Arg::BottomText => has(Param::BottomText),
                    Arg::Color => has(Param::Color),
                    Arg::Font => has(Param::Font),
                };
                assert!(fed, "{} drops {:?}", ep.name, arg);
            }
        }
    }

    #[test]
    fn routes_that_differ_from_the_name() {
        assert_eq!(find("paperplease").map(|ep| ep.route), Some("/citation"));
        assert_eq!(find("deepfried").map(|ep| ep.route), Some("/deepfry"));
        assert_eq!(find("tombstone").map(|ep| ep.output), Some(Output::File("rip.png")));
        assert_eq!(find("floor").map(|ep| ep.output), Some(Output::File("floor.png")));
        assert_eq!(find("yomomma").map(|ep| ep.output), Some(Output::Json));
        assert!(find("rainbow").is_none());
    }

    #[test]
    fn usage_lists_arguments() {
        assert_eq!(
            find("meme").map(Endpoint::usage).as_deref(),
            Some("meme [image] <top_text> <bottom_text> [color] [font]")
        );
        assert_eq!(find("bed").map(Endpoint::usage).as_deref(), Some("bed <member> [member]"));
    }
}
